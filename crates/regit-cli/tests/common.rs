#![allow(dead_code)]

use std::fs;
use std::panic;
use std::path::{Path, PathBuf};
use std::process::Command;

use httptest::{matchers::request, responders::status_code, Expectation, Server};

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

pub fn start_server(label: &str) -> Option<Server> {
    match panic::catch_unwind(Server::run) {
        Ok(server) => Some(server),
        Err(_) => {
            eprintln!("skipping {label} (httptest server unavailable)");
            None
        }
    }
}

pub fn git(cwd: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(cwd)
        .env("LC_ALL", "C")
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .args([
            "-c",
            "user.name=Regit Tests",
            "-c",
            "user.email=tests@regit.invalid",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .output()
        .expect("spawn git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("utf8 git output")
}

/// A two-commit repository on `main` with only loose objects.
pub struct SourceRepo {
    _temp: tempfile::TempDir,
    pub root: PathBuf,
    pub first: String,
    pub second: String,
}

impl SourceRepo {
    pub fn create() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("site");
        fs::create_dir_all(&root).expect("create site");
        git(&root, &["init", "-q"]);
        git(&root, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        fs::write(root.join("index.html"), "<h1>hello</h1>\n").expect("write index");
        git(&root, &["add", "index.html"]);
        git(&root, &["commit", "-q", "-m", "first"]);
        fs::write(root.join("index.html"), "<h1>hello again</h1>\n").expect("write index");
        git(&root, &["commit", "-q", "-am", "second"]);
        let first = git(&root, &["rev-parse", "HEAD~1"]).trim().to_string();
        let second = git(&root, &["rev-parse", "HEAD"]).trim().to_string();
        Self {
            _temp: temp,
            root,
            first,
            second,
        }
    }

    pub fn git_dir(&self) -> PathBuf {
        self.root.join(".git")
    }
}

/// Serve every file under `git_dir` at `/.git/<relative path>`.
pub fn serve_git_dir(server: &Server, git_dir: &Path) {
    for file in walk_files(git_dir) {
        let rel = file
            .strip_prefix(git_dir)
            .expect("relative path")
            .to_string_lossy()
            .replace('\\', "/");
        let body = fs::read(&file).expect("read served file");
        server.expect(
            Expectation::matching(request::method_path("GET", format!("/.git/{rel}")))
                .times(..)
                .respond_with(status_code(200).body(body)),
        );
    }
}

pub fn object_file(git_dir: &Path, id: &str) -> PathBuf {
    git_dir.join("objects").join(&id[..2]).join(&id[2..])
}

fn walk_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current).expect("read dir") {
            let path = entry.expect("dir entry").path();
            if path.is_dir() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files
}
