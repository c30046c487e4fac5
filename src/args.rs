use anyhow::{bail, Result};
use clap::{ArgAction, Parser};
use remap_core::{PatchDescriptor, RemapConfig};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(author, version, about, disable_help_flag = true)]
pub struct Args {
    /// Path to input JAR file. Can be provided multiple times.
    #[arg(long, value_name = "PATH", required = true)]
    pub input: Vec<PathBuf>,

    /// Path to output JAR file (replaced if it exists).
    #[arg(long, value_name = "PATH", required = true)]
    pub output: Vec<PathBuf>,

    /// Path to reference JAR file. Contributes class hierarchy and patch sources only.
    #[arg(long = "ref", value_name = "PATH")]
    pub references: Vec<PathBuf>,

    /// Path to mapping file. Can be provided multiple times.
    #[arg(long = "mapFile", value_name = "PATH")]
    pub map_file: Vec<PathBuf>,

    /// Manual mapping entry, e.g. `CL: a/B c/D`. Applied after all mapping files.
    #[arg(long = "map", value_name = "LINE")]
    pub map: Vec<String>,

    /// Package for classes whose mapped name has none.
    #[arg(long = "defaultPkg", value_name = "PKG")]
    pub default_pkg: Vec<String>,

    /// Force every declared field, method and inner class to be public.
    #[arg(long = "forcePublic", default_value_t = false)]
    pub force_public: bool,

    /// Prefix to strip from xdelta (GDiff) entries.
    #[arg(long = "xdeltaPrefix", value_name = "STR", num_args = 0..=1, default_missing_value = "")]
    pub xdelta_prefix: Vec<String>,

    /// Postfix of xdelta (GDiff) entries.
    #[arg(long = "xdeltaPostfix", value_name = "STR", num_args = 0..=1, default_missing_value = "")]
    pub xdelta_postfix: Vec<String>,

    /// Print the run summary as JSON on stdout.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Print help.
    #[arg(short = '?', long, action = ArgAction::Help)]
    pub help: Option<bool>,
}

impl Args {
    /// Cardinality rules clap cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.output.len() != 1 {
            bail!("Maximum of 1 output file is allowed");
        }
        if self.default_pkg.len() > 1 {
            bail!("Maximum of 1 default package is allowed");
        }
        if self.xdelta_prefix.is_empty() != self.xdelta_postfix.is_empty() {
            bail!("xdeltaPrefix and xdeltaPostfix need to be defined together");
        }
        if self.xdelta_prefix.len() > 1 || self.xdelta_postfix.len() > 1 {
            bail!("Only 1 xpatch prefix and postfix is allowed");
        }
        Ok(())
    }

    pub fn default_package(&self) -> Option<String> {
        self.default_pkg.first().cloned()
    }

    pub fn patch_descriptor(&self) -> Option<PatchDescriptor> {
        match (self.xdelta_prefix.first(), self.xdelta_postfix.first()) {
            (Some(prefix), Some(postfix)) => Some(PatchDescriptor::new(prefix, postfix)),
            _ => None,
        }
    }

    /// Validate and build the pipeline configuration.
    pub fn to_config(&self) -> Result<RemapConfig> {
        self.validate()?;
        Ok(RemapConfig {
            inputs: self.input.clone(),
            output: self.output[0].clone(),
            references: self.references.clone(),
            force_public: self.force_public,
            patch: self.patch_descriptor(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> std::result::Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("jar-remapper").chain(args.iter().copied()))
    }

    #[test]
    fn test_minimal_invocation() {
        let args = parse(&["--input", "in.jar", "--output", "out.jar"]).unwrap();
        let config = args.to_config().unwrap();
        assert_eq!(config.inputs, vec![PathBuf::from("in.jar")]);
        assert_eq!(config.output, PathBuf::from("out.jar"));
        assert!(!config.force_public);
        assert_eq!(config.patch, None);
        assert_eq!(args.default_package(), None);
    }

    #[test]
    fn test_repeatable_flags_keep_order() {
        let args = parse(&[
            "--input", "a.jar", "--input", "b.jar", "--output", "out.jar",
            "--ref", "r.jar", "--mapFile", "one.srg", "--mapFile", "two.srg",
            "--map", "CL: a/B c/D", "--defaultPkg", "pkg", "--forcePublic",
        ])
        .unwrap();
        assert_eq!(args.input, vec![PathBuf::from("a.jar"), PathBuf::from("b.jar")]);
        assert_eq!(args.map_file, vec![PathBuf::from("one.srg"), PathBuf::from("two.srg")]);
        assert_eq!(args.map, vec!["CL: a/B c/D"]);
        assert_eq!(args.default_package().as_deref(), Some("pkg"));
        assert!(args.to_config().unwrap().force_public);
    }

    #[test]
    fn test_cardinality_rules() {
        let args = parse(&["--input", "a", "--output", "x", "--output", "y"]).unwrap();
        assert_eq!(
            args.validate().unwrap_err().to_string(),
            "Maximum of 1 output file is allowed"
        );

        let args = parse(&["--input", "a", "--output", "x", "--defaultPkg", "p", "--defaultPkg", "q"]).unwrap();
        assert_eq!(
            args.validate().unwrap_err().to_string(),
            "Maximum of 1 default package is allowed"
        );

        let args = parse(&["--input", "a", "--output", "x", "--xdeltaPrefix", "p_"]).unwrap();
        assert_eq!(
            args.validate().unwrap_err().to_string(),
            "xdeltaPrefix and xdeltaPostfix need to be defined together"
        );

        let args = parse(&[
            "--input", "a", "--output", "x",
            "--xdeltaPrefix", "p", "--xdeltaPrefix", "q", "--xdeltaPostfix", "s",
        ])
        .unwrap();
        assert_eq!(
            args.validate().unwrap_err().to_string(),
            "Only 1 xpatch prefix and postfix is allowed"
        );
    }

    #[test]
    fn test_xdelta_flags_without_value() {
        let args = parse(&["--input", "a", "--output", "x", "--xdeltaPrefix", "--xdeltaPostfix", ".bin"]).unwrap();
        assert_eq!(args.patch_descriptor(), Some(PatchDescriptor::new("", ".bin")));
    }

    #[test]
    fn test_help_flags() {
        assert_eq!(parse(&["-?"]).unwrap_err().kind(), ErrorKind::DisplayHelp);
        assert_eq!(parse(&["--help"]).unwrap_err().kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_missing_required() {
        assert_eq!(
            parse(&["--output", "x"]).unwrap_err().kind(),
            ErrorKind::MissingRequiredArgument
        );
    }
}
