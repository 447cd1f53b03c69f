use assert_cmd::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn has_git() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

fn git(dir: &Path, args: &[&str]) {
    assert!(Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
}

fn init_git_repo(dir: &Path) {
    git(dir, &["init"]);
    git(dir, &["config", "core.autocrlf", "false"]);
    git(dir, &["config", "core.safecrlf", "false"]);
    git(dir, &["config", "user.email", "you@example.com"]);
    git(dir, &["config", "user.name", "Your Name"]);
}

/// Writes every file then commits them together at `date` (author and committer).
fn commit_files(dir: &Path, files: &[(&str, &str)], date: &str) {
    for (name, content) in files {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.sync_all().unwrap();
    }
    git(dir, &["add", "."]);
    assert!(Command::new("git")
        .args(["commit", "-m", &format!("change at {date}")])
        .env("GIT_AUTHOR_DATE", date)
        .env("GIT_COMMITTER_DATE", date)
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
}

fn gcouple() -> Command {
    let mut cmd = Command::cargo_bin("gcouple").unwrap();
    cmd.env_remove("GCOUPLE_LOG");
    cmd
}

#[test]
fn coupling_csv_pairs_files_from_overlapping_day() {
    if !has_git() {
        return;
    }
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    init_git_repo(a.path());
    init_git_repo(b.path());

    commit_files(a.path(), &[("src/a.rs", "fn a(){}\n")], "2021-03-01T10:00:00+0000");
    commit_files(
        a.path(),
        &[("src/a.rs", "fn a(){}\nfn a2(){}\n"), ("src/b.rs", "fn b(){}\n")],
        "2021-03-05T10:00:00+0000",
    );
    commit_files(b.path(), &[("lib/x.py", "x = 1\n")], "2021-03-05T15:00:00+0000");
    commit_files(b.path(), &[("lib/y.py", "y = 2\n")], "2021-03-09T15:00:00+0000");

    let out = gcouple()
        .arg("--no-cache")
        .args(["coupling", "--csv", "-"])
        .arg(a.path())
        .arg(b.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert!(lines[0].starts_with("repoIndex,file,howManyTimes,togetherWith_0,"));
    // two tuples ((a.rs, x.py), (b.rs, x.py)), two rows each
    assert_eq!(lines.len(), 1 + 4);
    assert!(lines[1].starts_with("0,src/a.rs,1,lib/x.py,2,0.5,2,2,2,1,0,"));
    assert!(lines[2].starts_with("1,lib/x.py,1,src/a.rs,1,1,1,2,1,1,0,"));
    assert!(lines[3].starts_with("0,src/b.rs,1,lib/x.py,1,1,1,2,1,1,0,"));
    assert!(lines[4].starts_with("1,lib/x.py,1,src/b.rs,1,1,1,2,1,1,0,"));
    assert!(lines[1..].iter().all(|l| l.rsplit(',').next().map(str::len) == Some(7)));
}

#[test]
fn coupling_json_reports_self_coupling() {
    if !has_git() {
        return;
    }
    let dir = tempdir().unwrap();
    init_git_repo(dir.path());
    commit_files(dir.path(), &[("a.txt", "a\n")], "2019-03-01T10:00:00+0000");
    commit_files(
        dir.path(),
        &[("a.txt", "a\nb\n"), ("b.txt", "b\n"), ("c.txt", "c\n")],
        "2020-03-01T10:00:00+0000",
    );
    commit_files(
        dir.path(),
        &[("a.txt", "a\n"), ("b.txt", "bb\n"), ("c.txt", "cc\n")],
        "2021-03-01T10:00:00+0000",
    );

    let cache = tempdir().unwrap();
    let out = gcouple()
        .arg("--cache")
        .arg(cache.path())
        .args(["coupling", "--json"])
        .arg(dir.path())
        .arg(dir.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();

    assert_eq!(v["shared_windows"].as_u64(), Some(3));
    let tuples = v["tuples"].as_array().unwrap();
    assert_eq!(tuples.len(), 9);
    let self_pair = tuples
        .iter()
        .find(|t| t["paths"] == serde_json::json!(["a.txt", "a.txt"]))
        .unwrap();
    assert_eq!(self_pair["occurrences"].as_u64(), Some(3));
    assert!(cache.path().join("cache.db").exists());
}

#[test]
fn zero_day_window_is_rejected() {
    if !has_git() {
        return;
    }
    let dir = tempdir().unwrap();
    init_git_repo(dir.path());
    commit_files(dir.path(), &[("a.txt", "a\n")], "2021-03-01T10:00:00+0000");

    gcouple()
        .arg("--no-cache")
        .args(["coupling", "--window-days", "0"])
        .arg(dir.path())
        .assert()
        .failure();
}

#[test]
fn cloc_files_must_match_repositories() {
    if !has_git() {
        return;
    }
    let dir = tempdir().unwrap();
    init_git_repo(dir.path());
    commit_files(dir.path(), &[("a.txt", "a\n")], "2021-03-01T10:00:00+0000");
    let cloc = dir.path().join("cloc.csv");
    fs::write(&cloc, "language,filename,blank,comment,code\nText,a.txt,0,0,1\n").unwrap();

    gcouple()
        .arg("--no-cache")
        .arg("coupling")
        .arg("--cloc")
        .arg(&cloc)
        .arg(dir.path())
        .arg(dir.path())
        .assert()
        .failure();
}

#[test]
fn churn_json_outputs_entries() {
    if !has_git() {
        return;
    }
    let dir = tempdir().unwrap();
    init_git_repo(dir.path());
    commit_files(dir.path(), &[("lib.rs", "pub fn hi(){}\n")], "2021-03-01T10:00:00+0000");
    commit_files(
        dir.path(),
        &[("lib.rs", "pub fn hi(){ println!(\"hi\"); }\n")],
        "2021-03-02T10:00:00+0000",
    );

    let out = gcouple()
        .args(["churn", "--json", "--repo"])
        .arg(dir.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let entries = v["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["key"], "lib.rs");
    assert_eq!(entries[0]["commit_count"].as_u64(), Some(2));
}

#[test]
fn export_ndjson_emits_one_event_per_file_change() {
    if !has_git() {
        return;
    }
    let dir = tempdir().unwrap();
    init_git_repo(dir.path());
    commit_files(dir.path(), &[("a.txt", "a\n"), ("b.txt", "b\n")], "2021-03-01T10:00:00+0000");
    commit_files(dir.path(), &[("a.txt", "a\nmore\n")], "2021-03-02T10:00:00+0000");

    let out = gcouple()
        .arg("--no-cache")
        .args(["export", "--ndjson", "--repo"])
        .arg(dir.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let events: Vec<serde_json::Value> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(events.len(), 3);
    assert_eq!(events[2]["path"], "a.txt");
    assert_eq!(events[2]["lines_added"].as_u64(), Some(1));
    assert!(events.iter().all(|e| e["commit_id"].as_str().map(str::len) == Some(7)));
    assert!(events.iter().filter(|e| e["path"] == "a.txt").all(|e| e["cloc"].as_u64() == Some(2)));
}
