use assert_cmd::Command;
use predicates::prelude::*;
use remap_classfile::{ClassFile, ClassFileBuilder};
use remap_core::{ArchiveReader, ArchiveWriter};
use std::path::Path;
use tempfile::TempDir;

fn remapper() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("jar-remapper").unwrap()
}

fn write_jar(path: &Path, entries: &[(&str, Vec<u8>)]) {
    let mut writer = ArchiveWriter::create(path).unwrap();
    for (name, data) in entries {
        writer.write_file(name, data).unwrap();
    }
    writer.finish().unwrap();
}

fn entry_names(path: &Path) -> Vec<String> {
    let mut reader = ArchiveReader::open(path).unwrap();
    (0..reader.len())
        .map(|index| reader.entry(index).unwrap().name)
        .collect()
}

fn class_bytes(name: &str) -> Vec<u8> {
    ClassFileBuilder::new(name, Some("java/lang/Object"))
        .unwrap()
        .build()
        .unwrap()
}

#[test]
fn test_help_exits_zero() {
    remapper()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--mapFile"));
    remapper().arg("-?").assert().success();
}

#[test]
fn test_missing_input_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    remapper()
        .arg("--output")
        .arg(temp_dir.path().join("out.jar"))
        .assert()
        .code(1);
}

#[test]
fn test_conflicting_options() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("in.jar");
    write_jar(&input, &[("a/B.class", class_bytes("a/B"))]);
    let output = temp_dir.path().join("out.jar");

    remapper()
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .arg("--output")
        .arg(temp_dir.path().join("other.jar"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Maximum of 1 output file is allowed"));

    remapper()
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .arg("--xdeltaPrefix")
        .arg("patched_")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "xdeltaPrefix and xdeltaPostfix need to be defined together",
        ));

    // nothing was written
    assert!(!output.exists());
}

#[test]
fn test_missing_mapping_file() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("in.jar");
    write_jar(&input, &[("a/B.class", class_bytes("a/B"))]);

    remapper()
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(temp_dir.path().join("out.jar"))
        .arg("--mapFile")
        .arg(temp_dir.path().join("absent.srg"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("absent.srg"));
}

#[test]
fn test_end_to_end_rename() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("in.jar");
    let output = temp_dir.path().join("out.jar");
    let mappings = temp_dir.path().join("mappings.srg");
    write_jar(
        &input,
        &[
            ("a/B.class", class_bytes("a/B")),
            ("x/Loose.class", class_bytes("Loose")),
            ("readme.txt", b"hi".to_vec()),
        ],
    );
    std::fs::write(&mappings, "CL: a/B c/D\n").unwrap();

    remapper()
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .arg("--mapFile")
        .arg(&mappings)
        .arg("--map")
        .arg("CL: Loose Tidy")
        .arg("--defaultPkg")
        .arg("pkg")
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""classes":2"#))
        .stdout(predicate::str::contains(r#""copied":1"#));

    assert_eq!(
        entry_names(&output),
        vec!["c/D.class", "pkg/Tidy.class", "readme.txt"]
    );

    let mut reader = ArchiveReader::open(&output).unwrap();
    let class = ClassFile::parse(&reader.entry(0).unwrap().data).unwrap();
    assert_eq!(class.name().unwrap(), "c/D");
}

#[test]
fn test_patch_flags_reconstruct_entry() {
    let temp_dir = TempDir::new().unwrap();
    let reference = temp_dir.path().join("ref.jar");
    let input = temp_dir.path().join("in.jar");
    let output = temp_dir.path().join("out.jar");

    let original = class_bytes("a/B");
    write_jar(&reference, &[("a/B.class", original.clone())]);

    let mut delta = vec![0xD1, 0xFF, 0xD1, 0xFF, 0x04, 250, 0, 0];
    delta.extend_from_slice(&(original.len() as u16).to_be_bytes());
    write_jar(&input, &[("patched_a/B.class.bin", delta)]);

    remapper()
        .arg("--input")
        .arg(&input)
        .arg("--ref")
        .arg(&reference)
        .arg("--output")
        .arg(&output)
        .arg("--map")
        .arg("CL: a/B c/D")
        .arg("--xdeltaPrefix")
        .arg("patched_")
        .arg("--xdeltaPostfix")
        .arg(".bin")
        .assert()
        .success();

    assert_eq!(entry_names(&output), vec!["c/D.class"]);
}

#[test]
fn test_inline_maps_apply_after_mapping_files() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("in.jar");
    let output = temp_dir.path().join("out.jar");
    let first = temp_dir.path().join("first.srg");
    let second = temp_dir.path().join("second.srg");
    write_jar(
        &input,
        &[
            ("a/B.class", class_bytes("a/B")),
            ("x/Y.class", class_bytes("x/Y")),
        ],
    );
    std::fs::write(&first, "CL: a/B file/One\nCL: x/Y file/Y\n").unwrap();
    std::fs::write(&second, "CL: a/B file/Two\n").unwrap();

    // --map comes first on the command line but is still applied last
    remapper()
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .arg("--map")
        .arg("CL: a/B inline/B")
        .arg("--mapFile")
        .arg(&first)
        .arg("--mapFile")
        .arg(&second)
        .assert()
        .success();

    assert_eq!(entry_names(&output), vec!["inline/B.class", "file/Y.class"]);

    // without the inline line, the later file wins
    remapper()
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .arg("--mapFile")
        .arg(&first)
        .arg("--mapFile")
        .arg(&second)
        .assert()
        .success();

    assert_eq!(entry_names(&output), vec!["file/Two.class", "file/Y.class"]);
}
