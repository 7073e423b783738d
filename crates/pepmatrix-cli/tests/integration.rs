use pepmatrix_cli::input::Input;
use pepmatrix_cli::runner::Runner;
use std::collections::HashMap;
use std::path::Path;

const CONTROL: &str = "peptide\tprotein_group\taccessions\tscore\tspectral_count
AAAGGG\tG1\tP1\t50\t2
CCCDDD\tG2\tP2\t30\t1
LQSRPAAPPAPGPGQLTLR\tG3\tP3\t99\t1
BAD\tG4\tP4\tx\t1
";

const TREATED: &str = "peptide\tprotein_group\taccessions\tscore\tspectral_count
AAAGG[+1.0]G\tG1\tP1\t60\t4
";

fn write(dir: &Path, name: &str, contents: &str) -> anyhow::Result<String> {
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    Ok(path.display().to_string())
}

#[test]
fn integration() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("out");

    let public = write(dir.path(), "public.fasta", ">pub1\nMKLQSRPAAPPAPGPGQLTLRK\n")?;
    let reference = write(
        dir.path(),
        "reference.fasta",
        ">ref1\nMKAAAGGGRCCCDDDK\n>ref2\nMKAAAGGGR\n",
    )?;
    let control_db = write(
        dir.path(),
        "control.fasta",
        ">c1\nMKAAAGGGR\n>c2\nMKCCCDDDR\n>rev_c3\nAAAGGG\n",
    )?;
    let treated_db = write(dir.path(), "treated.fasta", ">t1\nMKAAAGGGR\n>t2\nAAAGGGK\n")?;
    let control = write(dir.path(), "control.tsv", CONTROL)?;
    let treated = write(dir.path(), "treated.tsv", TREATED)?;

    let config = serde_json::json!({
        "samples": [
            { "path": control, "sample": "Control_1", "database": control_db },
            { "path": treated, "sample": "Treated_1", "database": treated_db },
            { "path": dir.path().join("missing.tsv"), "sample": "Blank_1" },
        ],
        "conditions": ["Control", "Treated", "Blank"],
        "replicates": 1,
        "public_database": public,
        "reference_database": reference,
        "exclude_accession_tag": "rev_",
        "threads": 2,
        "output_directory": out,
    });
    let parameters = write(dir.path(), "params.json", &config.to_string())?;

    let settings = Input::load(&parameters)?.build()?;
    let summary = Runner::new(settings)?.run()?;

    assert_eq!(summary.samples_read, 2);
    assert_eq!(summary.samples_skipped, 1);
    assert_eq!(summary.malformed_rows, 1);
    assert_eq!(summary.dropped_public, 1);
    assert_eq!(summary.rows, 2);
    assert!(out.join("pepmatrix.json").exists());

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(out.join("matrix.pepmatrix.tsv"))?;
    let headers = rdr.headers()?.clone();
    let rows = rdr
        .records()
        .map(|record| {
            record.map(|record| {
                headers
                    .iter()
                    .zip(record.iter())
                    .map(|(h, v)| (h.to_string(), v.to_string()))
                    .collect::<HashMap<_, _>>()
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    assert_eq!(rows.len(), 2);

    let aaaggg = &rows[0];
    assert_eq!(aaaggg["sequence"], "AAAGGG");
    // Backed by two records, control and (after stripping) treated
    assert_eq!(aaaggg["unique_to_protein_group"], "N");
    // Unique within the control database (the `rev_` entry is excluded), not the treated one
    assert_eq!(aaaggg["unique_to_sample_database"], "Y");
    assert_eq!(aaaggg["public_unique"], "N");
    assert_eq!(aaaggg["reference_unique"], "N");
    assert_eq!(aaaggg["combined_unique"], "N");
    assert_eq!(aaaggg["Control_1_count"], "2");
    assert_eq!(aaaggg["Treated_1_count"], "4");
    assert_eq!(aaaggg["Blank_1_count"], "0");
    assert_eq!(aaaggg["Treated_1_score"], "60.0");
    assert_eq!(aaaggg["Treated_1_coverage"], "60.0");
    assert_eq!(aaaggg["Blank_1_coverage"], "N/A");
    assert_eq!(aaaggg["default_count"], "2");

    let cccddd = &rows[1];
    assert_eq!(cccddd["sequence"], "CCCDDD");
    assert_eq!(cccddd["unique_to_protein_group"], "Y");
    assert_eq!(cccddd["reference_unique"], "Y");
    assert_eq!(cccddd["combined_unique"], "Y");
    assert_eq!(cccddd["individual_unique"], "Y");
    assert_eq!(cccddd["Control_1_count"], "1");
    assert_eq!(cccddd["Treated_1_count"], "0");

    Ok(())
}
