// End to end runs of the pdfshelf binary
mod common;

use assert_cmd::Command;
use pdfshelf::storage::{Library, NewDocument};
use predicates::prelude::*;
use tempfile::TempDir;

// Isolated config dir so a user's config.toml never leaks in
fn pdfshelf(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pdfshelf").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.path())
        .env("HOME", home.path())
        .env_remove("PDFSHELF_GS")
        .env_remove("PDFSHELF_DB")
        .env_remove("RUST_LOG");
    cmd
}

fn seeded_db(home: &TempDir) -> String {
    let db = home.path().join("test.db");
    let library = Library::open(&db).unwrap();
    library
        .insert(&NewDocument {
            path: "/shelf/consensus.pdf".into(),
            pages: 18,
            sig: "feed".into(),
            title: "Paxos Made Simple".into(),
            text: "the consensus algorithm is among the simplest".into(),
            cover: b"%PDF".to_vec(),
        })
        .unwrap();
    db.display().to_string()
}

#[test]
fn help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    pdfshelf(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("search").and(predicate::str::contains("cover")));
}

#[test]
fn title_of_generated_pdf() {
    let home = TempDir::new().unwrap();
    let file = home.path().join("paper.pdf");
    std::fs::write(&file, common::titled_pdf(28, "Foundations of Computer Science")).unwrap();

    pdfshelf(&home)
        .arg("title")
        .arg(&file)
        .assert()
        .success()
        .stdout("Foundations of Computer Science\n");
}

#[test]
fn title_of_garbage_fails() {
    let home = TempDir::new().unwrap();
    let file = home.path().join("junk.pdf");
    std::fs::write(&file, b"not a pdf at all").unwrap();

    pdfshelf(&home)
        .arg("title")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("can't init reader"));
}

#[test]
fn search_prints_hits() {
    let home = TempDir::new().unwrap();
    let db = seeded_db(&home);
    pdfshelf(&home)
        .args(["-n", &db, "search", "--no-bold", "consensus"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "[1] /shelf/consensus.pdf (#18)\nTitle: Paxos Made Simple\n",
        ))
        .stdout(predicate::str::contains("consensus algorithm"));
}

#[test]
fn search_names_only() {
    let home = TempDir::new().unwrap();
    let db = seeded_db(&home);
    pdfshelf(&home)
        .args(["-n", &db, "search", "-t", "simplest"])
        .assert()
        .success()
        .stdout("[1] /shelf/consensus.pdf (#18)\n");
}

#[test]
fn list_by_like_expression() {
    let home = TempDir::new().unwrap();
    let db = seeded_db(&home);
    pdfshelf(&home)
        .args(["-n", &db, "list", "/shelf/%", "/nowhere/%"])
        .assert()
        .success()
        .stdout("[1] /shelf/consensus.pdf (#18)\nTitle: Paxos Made Simple\n");
}

#[test]
fn remove_then_remove_again() {
    let home = TempDir::new().unwrap();
    let db = seeded_db(&home);
    pdfshelf(&home).args(["-n", &db, "remove", "1"]).assert().success();
    pdfshelf(&home)
        .args(["-n", &db, "remove", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pdf with id 1 not found"));
}

#[test]
fn cover_of_unknown_id_fails() {
    let home = TempDir::new().unwrap();
    let db = seeded_db(&home);
    pdfshelf(&home)
        .args(["-n", &db, "cover", "-V", "true", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pdf with id 7 not found"));
}

#[test]
fn add_without_ghostscript_fails() {
    let home = TempDir::new().unwrap();
    let db = home.path().join("empty.db").display().to_string();
    pdfshelf(&home)
        .args(["-n", &db, "-e", "pdfshelf-missing-gs", "add"])
        .arg(home.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("pdfshelf-missing-gs"));
}

#[test]
fn bare_database_name_lands_in_config_dir() {
    let home = TempDir::new().unwrap();
    pdfshelf(&home)
        .args(["-n", "fresh.db", "list", "%"])
        .assert()
        .success()
        .stdout("");
    assert!(home.path().join("pdfshelf").join("fresh.db").is_file());
}

#[test]
fn invalid_config_is_reported() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("bad.toml");
    std::fs::write(&config, "[title]\ndictionary_ratio = 3.0\n").unwrap();
    pdfshelf(&home)
        .arg("--config")
        .arg(&config)
        .args(["list", "%"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("dictionary_ratio"));
}
