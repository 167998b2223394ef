// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn project_with(entries: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for entry in entries {
        std::fs::create_dir_all(dir.path().join(entry)).unwrap();
    }
    dir
}

#[test]
fn mirrors_allowlisted_dotfiles_and_plain_directories() {
    let project = project_with(&["src", ".claude", "docs"]);
    let client_dir = ensure_client_workspace(project.path(), "c1").unwrap();

    assert!(client_dir.join("src").symlink_metadata().is_ok());
    assert!(client_dir.join(".claude").symlink_metadata().is_ok());
    assert!(client_dir.join("docs").symlink_metadata().is_ok());
}

#[test]
fn skips_denylisted_and_unlisted_dotfile_entries() {
    let project = project_with(&["node_modules", "target", ".git", ".env"]);
    let client_dir = ensure_client_workspace(project.path(), "c1").unwrap();

    assert!(client_dir.join("node_modules").symlink_metadata().is_err());
    assert!(client_dir.join("target").symlink_metadata().is_err());
    assert!(client_dir.join(".git").symlink_metadata().is_err());
    assert!(client_dir.join(".env").symlink_metadata().is_err());
}

#[test]
fn preserves_an_existing_symlink_or_real_file_at_the_target() {
    let project = project_with(&["docs"]);
    let client_dir = project.path().join(".bridge-clients").join("c1");
    std::fs::create_dir_all(&client_dir).unwrap();
    std::fs::write(client_dir.join("docs"), b"agent output, not the project dir").unwrap();

    ensure_client_workspace(project.path(), "c1").unwrap();

    let contents = std::fs::read(client_dir.join("docs")).unwrap();
    assert_eq!(contents, b"agent output, not the project dir");
}

#[test]
fn relative_symlink_target_resolves_back_to_the_project_entry() {
    let project = project_with(&["src"]);
    std::fs::write(project.path().join("src").join("main.rs"), b"fn main() {}").unwrap();
    let client_dir = ensure_client_workspace(project.path(), "c1").unwrap();

    let resolved = std::fs::canonicalize(client_dir.join("src")).unwrap();
    let expected = std::fs::canonicalize(project.path().join("src")).unwrap();
    assert_eq!(resolved, expected);
}
