use std::path::PathBuf;

use anyhow::Context;
use hitlist_core::pipeline::ModSummaryRow;
use hitlist_core::psm::{ColumnFlags, Psm};
use hitlist_core::scan_group::ScanGroupRecord;

use crate::Runner;

/// Column names of the synopsis and first-hits tables
pub fn psm_headers(flags: &ColumnFlags) -> csv::ByteRecord {
    let [spec_evalue, evalue, q_value, pep_q_value] = flags.variant.score_headers();
    let rank = format!("Rank_{}", spec_evalue);

    let mut headers = vec![
        "ResultID",
        "Scan",
        "FragMethod",
        "SpecIndex",
        "Charge",
        "PrecursorMZ",
        "DelM",
        "DelM_PPM",
        "MH",
        "Peptide",
        "Protein",
        "NTT",
        "DeNovoScore",
        "MSGFScore",
        spec_evalue,
        rank.as_str(),
        evalue,
    ];
    if flags.has_efdr {
        headers.push("EFDR");
    } else {
        if flags.has_q_value {
            headers.push(q_value);
        }
        if flags.has_pep_q_value {
            headers.push(pep_q_value);
        }
    }
    if flags.has_isotope_error {
        headers.push("IsotopeError");
    }
    if flags.has_ims {
        headers.push("IMS_Scan");
        headers.push("IMS_Drift_Time");
    }
    csv::ByteRecord::from(headers)
}

pub fn serialize_psm(psm: &Psm, flags: &ColumnFlags) -> csv::ByteRecord {
    let raw = &psm.raw;
    let mut record = csv::ByteRecord::new();
    record.push_field(itoa::Buffer::new().format(psm.result_id).as_bytes());
    record.push_field(itoa::Buffer::new().format(raw.scan_num).as_bytes());
    record.push_field(raw.frag_method.as_bytes());
    record.push_field(raw.spec_index.as_bytes());
    record.push_field(itoa::Buffer::new().format(raw.charge).as_bytes());
    record.push_field(ryu::Buffer::new().format(raw.precursor_mz).as_bytes());
    record.push_field(ryu::Buffer::new().format(psm.delta_mass).as_bytes());
    record.push_field(ryu::Buffer::new().format(psm.delta_mass_ppm).as_bytes());
    record.push_field(ryu::Buffer::new().format(psm.mh).as_bytes());
    record.push_field(psm.peptide.to_string().as_bytes());
    record.push_field(raw.protein.as_bytes());
    record.push_field(itoa::Buffer::new().format(psm.ntt).as_bytes());
    record.push_field(itoa::Buffer::new().format(raw.de_novo_score).as_bytes());
    record.push_field(itoa::Buffer::new().format(raw.msgf_score).as_bytes());
    record.push_field(ryu::Buffer::new().format(raw.spec_evalue).as_bytes());
    record.push_field(itoa::Buffer::new().format(raw.rank).as_bytes());
    record.push_field(ryu::Buffer::new().format(raw.evalue).as_bytes());
    if flags.has_efdr {
        record.push_field(ryu::Buffer::new().format(raw.q_value).as_bytes());
    } else {
        if flags.has_q_value {
            record.push_field(ryu::Buffer::new().format(raw.q_value).as_bytes());
        }
        if flags.has_pep_q_value {
            record.push_field(ryu::Buffer::new().format(raw.pep_q_value).as_bytes());
        }
    }
    if flags.has_isotope_error {
        record.push_field(itoa::Buffer::new().format(raw.isotope_error).as_bytes());
    }
    if flags.has_ims {
        record.push_field(raw.ims_scan.as_bytes());
        record.push_field(raw.ims_drift_time.as_bytes());
    }
    record
}

fn serialize_mod(row: &ModSummaryRow) -> csv::ByteRecord {
    let mut record = csv::ByteRecord::new();
    let mut symbol = [0; 4];
    record.push_field(row.symbol.encode_utf8(&mut symbol).as_bytes());
    record.push_field(ryu::Buffer::new().format(row.mass).as_bytes());
    record.push_field(row.residues.as_bytes());
    record.push_field(row.mod_type.as_bytes());
    record.push_field(itoa::Buffer::new().format(row.occurrences).as_bytes());
    record
}

impl Runner {
    fn write_table<I>(&self, path: PathBuf, headers: csv::ByteRecord, rows: I) -> anyhow::Result<String>
    where
        I: IntoIterator<Item = csv::ByteRecord>,
    {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(vec![]);

        wtr.write_byte_record(&headers)?;
        for record in rows {
            wtr.write_byte_record(&record)?;
        }

        wtr.flush()?;
        let bytes = wtr.into_inner()?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write `{}`", path.display()))?;
        Ok(path.display().to_string())
    }

    /// Write `<base>_syn.txt` or `<base>_fht.txt`
    pub fn write_psms(
        &self,
        base: &str,
        suffix: &str,
        psms: &[Psm],
        flags: &ColumnFlags,
    ) -> anyhow::Result<String> {
        let path = self.make_path(format!("{}_{}.txt", base, suffix));
        self.write_table(
            path,
            psm_headers(flags),
            psms.iter().map(|psm| serialize_psm(psm, flags)),
        )
    }

    pub fn write_scan_groups(
        &self,
        base: &str,
        groups: &[ScanGroupRecord],
    ) -> anyhow::Result<String> {
        let path = self.make_path(format!("{}_ScanGroupInfo.txt", base));
        let headers = csv::ByteRecord::from(vec!["Scan_Group_ID", "Charge", "Scan"]);
        self.write_table(
            path,
            headers,
            groups.iter().map(|group| {
                let mut record = csv::ByteRecord::new();
                record.push_field(itoa::Buffer::new().format(group.scan_group_id).as_bytes());
                record.push_field(itoa::Buffer::new().format(group.charge).as_bytes());
                record.push_field(itoa::Buffer::new().format(group.scan).as_bytes());
                record
            }),
        )
    }

    pub fn write_mod_summary(
        &self,
        base: &str,
        rows: &[ModSummaryRow],
    ) -> anyhow::Result<String> {
        let path = self.make_path(format!("{}_ModSummary.txt", base));
        let headers = csv::ByteRecord::from(vec![
            "Modification_Symbol",
            "Modification_Mass",
            "Target_Residues",
            "Modification_Type",
            "Occurrence_Count",
        ]);
        self.write_table(path, headers, rows.iter().map(serialize_mod))
    }
}
