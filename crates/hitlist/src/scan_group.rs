//! Merged spectra: one search result reported for several scans
//!
//! A result whose scan field reads `100/101/102` is expanded into one result
//! per scan. Each distinct (charge, scan list) is a merge event. A scan group
//! ID is only allocated once a (charge, scan) pair seen in one merge event
//! turns up again in a different one; both events then share the ID.

use fnv::FnvHashMap;
use serde::Serialize;

use crate::psm::RawSearchResult;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ScanGroupRecord {
    pub scan_group_id: u32,
    pub charge: i16,
    pub scan: i32,
}

#[derive(Debug, Default)]
struct MergeEvent {
    members: Vec<(i16, i32)>,
    group: Option<u32>,
}

#[derive(Debug, Default)]
pub struct ScanGroupAssembler {
    events: Vec<MergeEvent>,
    event_ix: FnvHashMap<(i16, String), usize>,
    owner: FnvHashMap<(i16, i32), usize>,
    last_group: u32,
    mismatched: usize,
}

impl ScanGroupAssembler {
    fn event(&mut self, charge: i16, scans: &str) -> usize {
        let next = self.events.len();
        let ix = *self
            .event_ix
            .entry((charge, scans.to_string()))
            .or_insert(next);
        if ix == next {
            self.events.push(MergeEvent::default());
        }
        ix
    }

    fn link(&mut self, a: usize, b: usize) {
        let group = match self.events[a].group.or(self.events[b].group) {
            Some(group) => group,
            None => {
                self.last_group += 1;
                self.last_group
            }
        };
        for ix in [a, b] {
            if self.events[ix].group.is_none() {
                self.events[ix].group = Some(group);
            }
        }
    }

    /// Note that `(charge, scan)` was produced by merge event `event`
    pub fn record_group_membership(&mut self, event: usize, charge: i16, scan: i32) {
        match self.owner.get(&(charge, scan)).copied() {
            None => {
                self.owner.insert((charge, scan), event);
            }
            Some(owner) if owner == event => {}
            Some(owner) => self.link(owner, event),
        }
        let members = &mut self.events[event].members;
        if !members.contains(&(charge, scan)) {
            members.push((charge, scan));
        }
    }

    /// Expand a result into one result per scan it was reported for
    ///
    /// Spec index and fragmentation method are split in lockstep with the
    /// scan numbers. If they have fewer segments, the remaining results keep
    /// empty values; extra segments are ignored.
    pub fn expand(&mut self, raw: RawSearchResult) -> Vec<RawSearchResult> {
        let event = self.event(raw.charge, &raw.scan);

        if !raw.scan.contains('/') {
            self.record_group_membership(event, raw.charge, raw.scan_num);
            return vec![raw];
        }

        let scans = raw
            .scan
            .split('/')
            .filter_map(|s| s.trim().parse::<i32>().ok())
            .collect::<Vec<_>>();
        let spec_indices = raw.spec_index.split('/').collect::<Vec<_>>();
        let frag_methods = raw.frag_method.split('/').collect::<Vec<_>>();

        if spec_indices.len() != scans.len() || frag_methods.len() != scans.len() {
            self.mismatched += 1;
            if self.mismatched == 1 {
                log::warn!(
                    "merged scans `{}` list {} spec indices and {} fragmentation methods",
                    raw.scan,
                    spec_indices.len(),
                    frag_methods.len()
                );
            }
        }

        let mut expanded = Vec::with_capacity(scans.len());
        for (ix, scan) in scans.iter().enumerate() {
            self.record_group_membership(event, raw.charge, *scan);
            expanded.push(RawSearchResult {
                scan: scan.to_string(),
                scan_num: *scan,
                spec_index: spec_indices.get(ix).copied().unwrap_or_default().into(),
                frag_method: frag_methods.get(ix).copied().unwrap_or_default().into(),
                ..raw.clone()
            });
        }
        expanded
    }

    /// Number of merged results whose spec index or fragmentation method
    /// lists did not line up with the scan list
    pub fn mismatched(&self) -> usize {
        self.mismatched
    }

    pub fn has_groups(&self) -> bool {
        self.events.iter().any(|e| e.group.is_some())
    }

    /// Every member of every event that was assigned a group, sorted by group ID
    pub fn records(&self) -> Vec<ScanGroupRecord> {
        let mut records = self
            .events
            .iter()
            .filter_map(|e| e.group.map(|g| (g, e)))
            .flat_map(|(scan_group_id, e)| {
                e.members.iter().map(move |&(charge, scan)| ScanGroupRecord {
                    scan_group_id,
                    charge,
                    scan,
                })
            })
            .collect::<Vec<_>>();
        records.sort();
        records.dedup();
        records
    }
}
