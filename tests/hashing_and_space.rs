// tests/hashing_and_space.rs

mod common;
use crate::common::*;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kern::errors::KernError;
use kern::fs::mock::MockFileSystem;
use kern::fs::{FileSystem, walk_files};
use kern::resource::{
    ContentHash, DepDecl, Resource, ResourceSpace, compute_file_hash, get_resource,
    resolve_resource_file,
};

fn space(fs: &MockFileSystem) -> ResourceSpace {
    ResourceSpace::new("ws", Arc::new(fs.clone()))
}

fn hash_of(fs: &MockFileSystem, id: &str) -> ContentHash {
    let space = space(fs);
    let resource = space
        .find_resource_by_id(id)
        .expect("valid id")
        .expect("resource exists");
    space.calculate_hash(&resource).expect("hashable")
}

#[test]
fn file_hash_is_blake3_hex() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("test.txt", b"hello world");

    let hash = compute_file_hash(&fs, &PathBuf::from("test.txt"))?;
    // blake3 hash of "hello world"
    assert_eq!(hash, "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24");
    Ok(())
}

#[test]
fn hash_is_deterministic_and_content_sensitive() {
    let fs = MockFileSystem::new();
    fs.add_file("ws/a/resource.toml", ResourceBuilder::new(KIND, "a").to_toml());
    fs.add_file("ws/a/src/main.rs", "fn main() {}");

    let first = hash_of(&fs, "Task:a");
    assert_eq!(first, hash_of(&fs, "Task:a"));

    fs.add_file("ws/a/src/main.rs", "fn main() { println!(); }");
    let edited = hash_of(&fs, "Task:a");
    assert_ne!(first, edited);

    // Renaming changes the hash as well.
    fs.remove_file(Path::new("ws/a/src/main.rs")).expect("file exists");
    fs.add_file("ws/a/src/app.rs", "fn main() { println!(); }");
    assert_ne!(edited, hash_of(&fs, "Task:a"));
}

#[test]
fn one_space_hashes_each_resource_once() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("ws/a/resource.toml", ResourceBuilder::new(KIND, "a").to_toml());
    fs.add_file("ws/a/lib.rs", "pub fn f() {}");
    let space = space(&fs);
    let resource = space.find_resource_by_id("Task:a")?.expect("resource exists");

    let first = space.calculate_hash(&resource)?;
    // A file that appears mid-run (a restored artifact, say) is not seen.
    fs.add_file("ws/a/a-build.out", "restored");
    assert_eq!(space.calculate_hash(&resource)?, first);
    assert_ne!(hash_of(&fs, "Task:a"), first, "a new space sees the file");
    Ok(())
}

#[test]
fn ignored_files_and_store_dir_do_not_count() {
    let fs = MockFileSystem::new();
    fs.add_file(
        "ws/a/resource.toml",
        ResourceBuilder::new(KIND, "a").spec("ignore", vec!["*.log"]).to_toml(),
    );
    fs.add_file("ws/a/lib.rs", "pub fn f() {}");
    let before = hash_of(&fs, "Task:a");

    fs.add_file("ws/a/debug.log", "noise");
    fs.add_file("ws/a/.kern/store/x.json", "{}");
    assert_eq!(before, hash_of(&fs, "Task:a"));
}

#[test]
fn match_limits_hashed_files_but_keeps_the_declaration() {
    let fs = MockFileSystem::new();
    let decl = ResourceBuilder::new(KIND, "a").spec("match", vec!["src/**"]);
    fs.add_file("ws/a/resource.toml", decl.to_toml());
    fs.add_file("ws/a/src/lib.rs", "pub fn f() {}");
    fs.add_file("ws/a/README.md", "docs");
    let before = hash_of(&fs, "Task:a");

    fs.add_file("ws/a/README.md", "more docs");
    assert_eq!(before, hash_of(&fs, "Task:a"));

    fs.add_file("ws/a/resource.toml", decl.command("build", "make").to_toml());
    assert_ne!(before, hash_of(&fs, "Task:a"));
}

#[test]
fn env_hash_covers_only_its_declaration_by_default() {
    let fs = MockFileSystem::new();
    fs.add_file("ws/envs/dev/resource.toml", ResourceBuilder::env_resource("dev").to_toml());
    let before = hash_of(&fs, "Env:dev");

    fs.add_file("ws/envs/dev/notes.txt", "unrelated");
    assert_eq!(before, hash_of(&fs, "Env:dev"));

    fs.add_file(
        "ws/envs/dev/resource.toml",
        ResourceBuilder::env_resource("dev").spec("region", "eu").to_toml(),
    );
    assert_ne!(before, hash_of(&fs, "Env:dev"));
}

#[test]
fn space_resolves_ids_softly() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("ws/a/resource.toml", ResourceBuilder::new(KIND, "a").to_toml());
    fs.add_file("ws/envs/dev/resource-dev.toml", ResourceBuilder::env_resource("dev").to_toml());
    fs.add_file("ws/other/config.toml", "kind = \"Task\"\n[metadata]\nname = \"hidden\"\n");
    let space = space(&fs);

    assert!(space.find_resource_by_id("Task:a")?.is_some());
    assert!(space.find_env("dev")?.is_some());
    assert!(space.find_resource_by_id("Task:missing")?.is_none());
    // Only `resource*.toml` files are declarations.
    assert!(space.find_resource_by_id("Task:hidden")?.is_none());

    let err = space.find_resource_by_id("not-an-id").expect_err("malformed id");
    assert!(matches!(err, KernError::Resource(_)));
    Ok(())
}

#[test]
fn walk_skips_store_and_git_dirs() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("ws/a.txt", "a");
    fs.add_file("ws/sub/b.txt", "b");
    fs.add_file("ws/.kern/store/s.json", "{}");
    fs.add_file("ws/.git/HEAD", "ref");

    let files = walk_files(&fs, Path::new("ws"))?;
    assert_eq!(
        files,
        [PathBuf::from("ws/a.txt"), PathBuf::from("ws/sub/b.txt")]
    );
    Ok(())
}

#[test]
fn loader_accepts_directories_and_rejects_non_resources() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("ws/a/resource.toml", ResourceBuilder::new(KIND, "a").to_toml());
    fs.add_file("ws/plain.toml", "title = \"not a resource\"");
    fs.add_file("ws/bad/resource.toml", "kind = \"Task\"\n[metadata]\nname = \"x:y\"\n");

    assert_eq!(
        resolve_resource_file(&fs, Path::new("ws/a"))?,
        PathBuf::from("ws/a/resource.toml")
    );
    assert!(resolve_resource_file(&fs, Path::new("ws/empty")).is_err());
    assert!(get_resource(&fs, Path::new("ws/plain.toml"))?.is_none());

    let err = get_resource(&fs, Path::new("ws/bad/resource.toml")).expect_err("':' in name");
    assert!(matches!(err, KernError::ResourceConfig(_)), "{err:?}");
    Ok(())
}

#[test]
fn dependencies_come_from_metadata_and_spec_references() {
    let resource: Resource = ResourceBuilder::new(KIND, "a")
        .depends_on_with("Task:b", Some("test"), Some("build"))
        .depends_on("Task:b")
        .spec("input", "$Task:c.build.output")
        .spec("plain", "$not a reference")
        .build_at("ws/a/resource.toml");

    assert_eq!(
        resource.declared_deps(),
        [DepDecl {
            id: "Task:b".into(),
            action1: Some("test".into()),
            action2: Some("build".into()),
        }]
    );
    assert_eq!(
        resource.spec_deps(),
        [DepDecl {
            id: "Task:c".into(),
            action1: None,
            action2: Some("build".into()),
        }]
    );
    assert!(resource.depends_on_env());
    assert_eq!(resource.id().as_str(), "Task:a");
    assert_eq!(resource.id().kind(), "Task");
    assert_eq!(resource.id().name(), "a");
}

#[test]
fn spec_path_moves_the_resource_directory() {
    let resource = ResourceBuilder::new(KIND, "a")
        .spec("path", "code")
        .build_at("ws/a/resource.toml");
    assert_eq!(resource.dir(), PathBuf::from("ws/a/code"));

    let fs = MockFileSystem::new();
    fs.add_file("ws/a/resource.toml", ResourceBuilder::new(KIND, "a").spec("path", "code").to_toml());
    fs.add_file("ws/a/code/main.rs", "one");
    let before = hash_of(&fs, "Task:a");
    fs.add_file("ws/a/other.txt", "outside the directory");
    assert_eq!(before, hash_of(&fs, "Task:a"));
}

#[test]
fn short_hash_never_splits_a_character() {
    let hex = ContentHash::new("d74981efa70a0c880b8d8c19");
    assert_eq!(hex.short(), "d74981efa70a");

    // Byte 12 falls inside the sixth `é`.
    let odd = format!("a{}", "é".repeat(10));
    assert_eq!(ContentHash::new(odd.clone()).short(), odd);
    assert_eq!(ContentHash::new("abc").short(), "abc");
}
