use std::path::{Path, PathBuf};

use anyhow::Result;
use remap_classfile::access::{ACC_PRIVATE, ACC_PUBLIC, ACC_STATIC};
use remap_classfile::{ClassFile, ClassFileBuilder, Constant};
use remap_core::{
    run, ArchiveReader, ArchiveWriter, MappingTable, PatchDescriptor, RemapConfig, RunSummary,
};
use tempfile::TempDir;

fn class_bytes(name: &str, super_name: &str) -> Vec<u8> {
    let mut builder = ClassFileBuilder::new(name, Some(super_name)).unwrap();
    builder.field(ACC_PRIVATE, "value", "I").unwrap();
    builder.method(ACC_PUBLIC, "<init>", "()V").unwrap();
    builder.build().unwrap()
}

/// Entries ending in `/` become directories.
fn write_jar(path: &Path, entries: &[(&str, Vec<u8>)]) -> Result<()> {
    let mut writer = ArchiveWriter::create(path)?;
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(name)?;
        } else {
            writer.write_file(name, data)?;
        }
    }
    writer.finish()
}

fn read_jar(path: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let mut reader = ArchiveReader::open(path)?;
    (0..reader.len())
        .map(|index| reader.entry(index).map(|entry| (entry.name, entry.data)))
        .collect()
}

fn names(entries: &[(String, Vec<u8>)]) -> Vec<&str> {
    entries.iter().map(|(name, _)| name.as_str()).collect()
}

fn table(lines: &[&str]) -> MappingTable {
    let mut table = MappingTable::default();
    for line in lines {
        table.read_mapping_line(line);
    }
    table
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// File names in the fixture directory, sorted.
    fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = std::fs::read_dir(self.dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        files
    }
}

#[test]
fn test_class_is_renamed_and_moved() -> Result<()> {
    let fx = Fixture::new();
    write_jar(
        &fx.path("in.jar"),
        &[
            ("META-INF/", Vec::new()),
            ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n".to_vec()),
            ("a/B.class", class_bytes("a/B", "java/lang/Object")),
        ],
    )?;

    let config = RemapConfig::new(vec![fx.path("in.jar")], fx.path("out.jar"));
    let summary = run(&config, &table(&["CL: a/B c/D"]))?;
    assert_eq!(
        summary,
        RunSummary {
            classes: 1,
            renamed: 1,
            copied: 2,
            patched: 0
        }
    );

    let out = read_jar(&fx.path("out.jar"))?;
    assert_eq!(names(&out), vec!["META-INF/", "META-INF/MANIFEST.MF", "c/D.class"]);
    assert_eq!(out[1].1, b"Manifest-Version: 1.0\n");
    let class = ClassFile::parse(&out[2].1)?;
    assert_eq!(class.name()?, "c/D");
    assert_eq!(class.super_name()?.as_deref(), Some("java/lang/Object"));

    assert_eq!(fx.files(), vec!["in.jar", "out.jar"]);
    Ok(())
}

#[test]
fn test_empty_table_round_trips() -> Result<()> {
    let fx = Fixture::new();
    let entries = vec![
        ("a/B.class", class_bytes("a/B", "java/lang/Object")),
        ("a/C.class", class_bytes("a/C", "a/B")),
        ("res/data.txt", b"payload".to_vec()),
    ];
    write_jar(&fx.path("in.jar"), &entries)?;

    let config = RemapConfig::new(vec![fx.path("in.jar")], fx.path("out.jar"));
    let summary = run(&config, &MappingTable::default())?;
    assert_eq!(summary.renamed, 0);

    let out = read_jar(&fx.path("out.jar"))?;
    assert_eq!(out.len(), entries.len());
    for ((name, data), (out_name, out_data)) in entries.iter().zip(&out) {
        assert_eq!(*name, out_name.as_str());
        assert_eq!(data, out_data);
    }
    Ok(())
}

#[test]
fn test_output_is_replaced() -> Result<()> {
    let fx = Fixture::new();
    write_jar(&fx.path("in.jar"), &[("x.txt", b"new".to_vec())])?;
    std::fs::write(fx.path("out.jar"), b"stale")?;

    let config = RemapConfig::new(vec![fx.path("in.jar")], fx.path("out.jar"));
    run(&config, &MappingTable::default())?;

    assert_eq!(names(&read_jar(&fx.path("out.jar"))?), vec!["x.txt"]);
    Ok(())
}

#[test]
fn test_inherited_method_resolves_through_reference() -> Result<()> {
    let fx = Fixture::new();
    let mut base = ClassFileBuilder::new("lib/Base", Some("java/lang/Object"))?;
    base.method(ACC_PUBLIC, "m", "()V")?;
    write_jar(&fx.path("ref.jar"), &[("lib/Base.class", base.build()?)])?;

    let mut child = ClassFileBuilder::new("a/Child", Some("lib/Base"))?;
    child.method_ref("a/Child", "m", "()V")?;
    write_jar(&fx.path("in.jar"), &[("a/Child.class", child.build()?)])?;

    let mut config = RemapConfig::new(vec![fx.path("in.jar")], fx.path("out.jar"));
    config.references = vec![fx.path("ref.jar")];
    run(
        &config,
        &table(&["CL: lib/Base lib/Base", "MD: lib/Base/m ()V lib/Base/renamed ()V"]),
    )?;

    // references only feed the hierarchy; nothing of theirs is written
    let out = read_jar(&fx.path("out.jar"))?;
    assert_eq!(names(&out), vec!["a/Child.class"]);

    let class = ClassFile::parse(&out[0].1)?;
    let called: Vec<String> = class
        .constant_pool
        .iter()
        .filter_map(|(_, constant)| match constant {
            Constant::MethodRef(member) => class
                .constant_pool
                .name_and_type(member.name_and_type_index)
                .ok()
                .map(|(name, _)| name),
            _ => None,
        })
        .collect();
    assert_eq!(called, vec!["renamed"]);
    Ok(())
}

fn full_copy_delta(len: u16) -> Vec<u8> {
    let mut delta = remap_gdiff::MAGIC.to_vec();
    delta.push(remap_gdiff::VERSION);
    // copy (u16 offset, u16 length); the EOF command is left for the pipeline
    delta.push(250);
    delta.extend_from_slice(&0u16.to_be_bytes());
    delta.extend_from_slice(&len.to_be_bytes());
    delta
}

#[test]
fn test_patched_entry_is_reconstructed_and_renamed() -> Result<()> {
    let fx = Fixture::new();
    let original = class_bytes("a/B", "java/lang/Object");
    write_jar(&fx.path("ref.jar"), &[("a/B.class", original.clone())])?;
    write_jar(
        &fx.path("in.jar"),
        &[("patched_a/B.class.bin", full_copy_delta(original.len() as u16))],
    )?;

    let mut config = RemapConfig::new(vec![fx.path("in.jar")], fx.path("out.jar"));
    config.references = vec![fx.path("ref.jar")];
    config.patch = Some(PatchDescriptor::new("patched_", ".bin"));
    let summary = run(&config, &table(&["CL: a/B c/D"]))?;
    assert_eq!(summary.patched, 1);
    assert_eq!(summary.classes, 1);

    let out = read_jar(&fx.path("out.jar"))?;
    assert_eq!(names(&out), vec!["c/D.class"]);
    assert_eq!(ClassFile::parse(&out[0].1)?.name()?, "c/D");
    Ok(())
}

#[test]
fn test_patch_without_original_is_copied() -> Result<()> {
    let fx = Fixture::new();
    write_jar(&fx.path("in.jar"), &[("patched_X.bin", b"opaque".to_vec())])?;

    let mut config = RemapConfig::new(vec![fx.path("in.jar")], fx.path("out.jar"));
    config.patch = Some(PatchDescriptor::new("patched_", ".bin"));
    let summary = run(&config, &MappingTable::default())?;
    assert_eq!(summary.patched, 0);

    let out = read_jar(&fx.path("out.jar"))?;
    assert_eq!(out, vec![("patched_X.bin".to_string(), b"opaque".to_vec())]);
    Ok(())
}

#[test]
fn test_force_public() -> Result<()> {
    let fx = Fixture::new();
    let mut builder = ClassFileBuilder::new("a/B", Some("java/lang/Object"))?;
    builder.field(ACC_PRIVATE | ACC_STATIC, "f", "I")?;
    write_jar(&fx.path("in.jar"), &[("a/B.class", builder.build()?)])?;

    let mut config = RemapConfig::new(vec![fx.path("in.jar")], fx.path("out.jar"));
    config.force_public = true;
    run(&config, &MappingTable::default())?;

    let out = read_jar(&fx.path("out.jar"))?;
    let class = ClassFile::parse(&out[0].1)?;
    assert_eq!(class.fields[0].access_flags, ACC_PUBLIC | ACC_STATIC);
    Ok(())
}

#[test]
fn test_failed_run_leaves_output_untouched() -> Result<()> {
    let fx = Fixture::new();
    write_jar(
        &fx.path("in.jar"),
        &[
            ("ok.txt", b"fine".to_vec()),
            ("broken.class", b"not a class".to_vec()),
        ],
    )?;
    std::fs::write(fx.path("out.jar"), b"previous")?;

    let config = RemapConfig::new(vec![fx.path("in.jar")], fx.path("out.jar"));
    let err = run(&config, &MappingTable::default()).unwrap_err();
    assert!(format!("{:#}", err).contains("broken.class"));

    assert_eq!(std::fs::read(fx.path("out.jar"))?, b"previous");
    assert_eq!(fx.files(), vec!["in.jar", "out.jar"]);
    Ok(())
}

#[test]
fn test_multiple_inputs_keep_order() -> Result<()> {
    let fx = Fixture::new();
    write_jar(&fx.path("one.jar"), &[("1.txt", b"1".to_vec()), ("2.txt", b"2".to_vec())])?;
    write_jar(&fx.path("two.jar"), &[("3.txt", b"3".to_vec())])?;

    let config = RemapConfig::new(
        vec![fx.path("one.jar"), fx.path("two.jar")],
        fx.path("out.jar"),
    );
    run(&config, &MappingTable::default())?;

    assert_eq!(
        names(&read_jar(&fx.path("out.jar"))?),
        vec!["1.txt", "2.txt", "3.txt"]
    );
    Ok(())
}

#[test]
fn test_input_next_to_output_is_not_clobbered() -> Result<()> {
    let fx = Fixture::new();
    let entries: Vec<(String, Vec<u8>)> = (0..50)
        .map(|i| (format!("res/{}.txt", i), vec![i as u8; 16]))
        .collect();
    let borrowed: Vec<(&str, Vec<u8>)> = entries
        .iter()
        .map(|(name, data)| (name.as_str(), data.clone()))
        .collect();
    write_jar(&fx.path("out.jar.tmp"), &borrowed)?;
    let before = std::fs::read(fx.path("out.jar.tmp"))?;

    let config = RemapConfig::new(vec![fx.path("out.jar.tmp")], fx.path("out.jar"));
    run(&config, &MappingTable::default())?;

    assert_eq!(std::fs::read(fx.path("out.jar.tmp"))?, before);
    assert_eq!(read_jar(&fx.path("out.jar"))?, entries);
    assert_eq!(fx.files(), vec!["out.jar", "out.jar.tmp"]);
    Ok(())
}

#[test]
fn test_failed_run_keeps_neighbouring_files() -> Result<()> {
    let fx = Fixture::new();
    write_jar(&fx.path("out.jar.tmp"), &[("broken.class", b"nope".to_vec())])?;
    let before = std::fs::read(fx.path("out.jar.tmp"))?;

    let config = RemapConfig::new(vec![fx.path("out.jar.tmp")], fx.path("out.jar"));
    assert!(run(&config, &MappingTable::default()).is_err());

    assert_eq!(std::fs::read(fx.path("out.jar.tmp"))?, before);
    assert_eq!(fx.files(), vec!["out.jar.tmp"]);
    Ok(())
}

#[test]
fn test_colliding_class_names_are_all_written() -> Result<()> {
    let fx = Fixture::new();
    write_jar(&fx.path("one.jar"), &[("a/B.class", class_bytes("a/B", "java/lang/Object"))])?;
    write_jar(&fx.path("two.jar"), &[("x/Y.class", class_bytes("x/Y", "java/lang/Object"))])?;

    let config = RemapConfig::new(
        vec![fx.path("one.jar"), fx.path("two.jar")],
        fx.path("out.jar"),
    );
    let summary = run(&config, &table(&["CL: a/B c/D", "CL: x/Y c/D"]))?;
    assert_eq!(summary.classes, 2);
    assert_eq!(summary.renamed, 2);

    let out = read_jar(&fx.path("out.jar"))?;
    assert_eq!(names(&out), vec!["c/D.class", "c/D.class"]);
    for (_, data) in &out {
        assert_eq!(ClassFile::parse(data)?.name()?, "c/D");
    }
    Ok(())
}
