//! Dataset file discovery on local storage.

use std::path::PathBuf;

use httcp_core::{Error, Result};

use crate::config::{Config, Dataset};

/// ROOT files of a dataset below a local base location, sorted by name.
///
/// The directory is `base` and `dataset_key` concatenated as strings, so
/// `base` normally ends with a separator and keys start with one.
pub fn dataset_lfns(base: &str, dataset_key: &str) -> Result<Vec<PathBuf>> {
    let dir = PathBuf::from(format!("{base}{dataset_key}"));
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "root") {
            paths.push(path);
        }
    }
    paths.sort();
    tracing::debug!(dir = %dir.display(), n_files = paths.len(), "listed dataset files");
    Ok(paths)
}

impl Config {
    /// Files of a dataset for campaigns produced at DESY, truncated to the
    /// dataset's file limit.
    pub fn dataset_lfns(&self, dataset: &Dataset) -> Result<Vec<PathBuf>> {
        if !self.campaign.is_desy_production() {
            return Err(Error::Validation(format!(
                "campaign '{}' has no local file location",
                self.campaign.name
            )));
        }
        let base = match self.campaign.custom.as_ref().and_then(|c| c.location.as_deref()) {
            Some(b) => b,
            None => {
                tracing::warn!(campaign = %self.campaign.name, "no base path in campaign, using ''");
                ""
            }
        };
        let mut files = dataset_lfns(base, &dataset.key)?;
        if let Some(n) = dataset.n_files {
            if self.validate_dataset_lfns && files.len() < n as usize {
                return Err(Error::Validation(format!(
                    "dataset '{}': expected {n} files, found {}",
                    dataset.name,
                    files.len()
                )));
            }
            files.truncate(n as usize);
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::CustomSite;
    use crate::presets;

    fn touch(dir: &std::path::Path, name: &str) {
        std::fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn lists_only_root_files_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let ds = tmp.path().join("h_ggf_htt");
        std::fs::create_dir(&ds).unwrap();
        touch(&ds, "b.root");
        touch(&ds, "a.root");
        touch(&ds, "notes.txt");
        std::fs::create_dir(ds.join("sub.root")).unwrap();

        let base = format!("{}/", tmp.path().display());
        let files = dataset_lfns(&base, "h_ggf_htt").unwrap();
        let names: Vec<_> =
            files.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
        assert_eq!(names, vec!["a.root", "b.root"]);
    }

    #[test]
    fn missing_directory_is_io_error() {
        let err = dataset_lfns("/definitely/not/here/", "x").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn config_applies_limit() {
        let tmp = tempfile::tempdir().unwrap();
        let ds_dir = tmp.path().join("h_ggf_htt");
        std::fs::create_dir(&ds_dir).unwrap();
        for i in 0..3 {
            touch(&ds_dir, &format!("f{i}.root"));
        }

        let ana = presets::analysis_httcp().unwrap();
        let mut cfg = ana.config("run3_2022_preEE_hlep_rare_limited").unwrap().clone();
        let mut dataset = cfg.dataset("h_ggf_htt").unwrap().clone();
        dataset.key = "h_ggf_htt".into();

        assert!(cfg.dataset_lfns(&dataset).is_err());

        cfg.campaign.custom = Some(CustomSite {
            creator: "desy".into(),
            location: Some(format!("{}/", tmp.path().display())),
        });
        let files = cfg.dataset_lfns(&dataset).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("f0.root"));
    }
}
