use hitlist_cli::input::Input;
use hitlist_cli::runner::Runner;

fn output_directory(name: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("hitlist-cli-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&path);
    path
}

fn read_table(path: &std::path::Path) -> Vec<Vec<String>> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| line.split('\t').map(String::from).collect())
        .collect()
}

fn run(name: &str, extra: &str) -> std::path::PathBuf {
    let directory = output_directory(name);
    let json = format!(
        r#"{{
            "mod_definitions": "../../tests/MSGFPlus_Mods.txt",
            "fasta": "../../tests/sample.fasta",
            "input_paths": ["../../tests/sample_msgfplus.tsv"],
            "output_directory": {:?}
            {}
        }}"#,
        directory.display().to_string(),
        extra
    );
    let input: Input = serde_json::from_str(&json).unwrap();
    let runner = input.build().and_then(Runner::new).unwrap();
    let search = runner.run(1).unwrap();
    assert!(search.output_paths.iter().any(|p| p.ends_with("results.json")));
    directory
}

#[test]
fn writes_all_tables() {
    let directory = run("all", "");

    let syn = read_table(&directory.join("sample_msgfplus_syn.txt"));
    assert_eq!(syn.len(), 8);
    assert_eq!(syn[0][0], "ResultID");
    assert_eq!(syn[0][14], "MSGFPlus_SpecEValue");
    assert_eq!(syn[0].len(), 20);
    assert!(syn.iter().all(|row| row.len() == 20));
    // best score first
    assert_eq!(syn[1][0], "1");
    assert_eq!(syn[1][1], "60");
    assert_eq!(syn[1][2], "CID");
    assert_eq!(syn[4][9], "-.M#DHTPQSQLK.A");
    assert_eq!(syn[7][9], "R.S@PEPTIDEK.A");
    assert_eq!(syn[7][15], "2");

    let fht = read_table(&directory.join("sample_msgfplus_fht.txt"));
    assert_eq!(fht.len(), 6);
    assert_eq!(fht[1][10], "sp|P00002|BETA");

    let groups = read_table(&directory.join("sample_msgfplus_ScanGroupInfo.txt"));
    assert_eq!(
        groups,
        vec![
            vec!["Scan_Group_ID", "Charge", "Scan"],
            vec!["1", "2", "60"],
            vec!["1", "2", "61"],
        ]
    );

    let mods = read_table(&directory.join("sample_msgfplus_ModSummary.txt"));
    assert_eq!(mods.len(), 5);
    assert_eq!(mods[3][0], "#");
    assert_eq!(mods[3][4], "2");

    let results: serde_json::Value =
        serde_json::from_slice(&std::fs::read(directory.join("results.json")).unwrap()).unwrap();
    assert_eq!(results["filter"]["evalue_threshold"], 0.75);
    assert_eq!(results["output_paths"].as_array().unwrap().len(), 5);
}

#[test]
fn optional_tables_can_be_skipped() {
    let directory = run(
        "skip",
        r#", "write_first_hits": false, "write_mod_summary": false, "filter": { "evalue_threshold": 1e-4, "spec_evalue_threshold": 1e-9 }"#,
    );

    assert!(directory.join("sample_msgfplus_syn.txt").exists());
    assert!(!directory.join("sample_msgfplus_fht.txt").exists());
    assert!(!directory.join("sample_msgfplus_ModSummary.txt").exists());

    // only the merged scans and scan 61 pass the stricter thresholds
    let syn = read_table(&directory.join("sample_msgfplus_syn.txt"));
    assert_eq!(syn.len(), 4);
}

#[test]
fn missing_mod_definitions_are_fatal() {
    let directory = output_directory("fatal");
    let json = format!(
        r#"{{
            "mod_definitions": "../../tests/does_not_exist.txt",
            "input_paths": ["../../tests/sample_msgfplus.tsv"],
            "output_directory": {:?}
        }}"#,
        directory.display().to_string()
    );
    let input: Input = serde_json::from_str(&json).unwrap();
    let err = input.build().and_then(Runner::new).err().unwrap();
    assert!(err.to_string().contains("modification definitions"));
}
