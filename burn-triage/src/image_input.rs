use crate::color_utils::symbols;
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Strict collection fails on missing, unsupported or unmatched sources;
/// permissive collection warns and skips them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInputConfig {
    pub strict_mode: bool,
}

impl Default for ImageInputConfig {
    fn default() -> Self {
        Self::strict()
    }
}

impl ImageInputConfig {
    pub fn strict() -> Self {
        Self::from_strict_flag(true)
    }

    pub fn permissive() -> Self {
        Self::from_strict_flag(false)
    }

    pub fn from_strict_flag(strict_mode: bool) -> Self {
        Self { strict_mode }
    }
}

/// Supports: jpg, jpeg, png, webp, bmp, tiff, tif
pub fn is_supported_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            matches!(
                ext.to_string_lossy().to_lowercase().as_str(),
                "jpg" | "jpeg" | "png" | "webp" | "bmp" | "tiff" | "tif"
            )
        })
        .unwrap_or(false)
}

/// Find all image files in a directory (non-recursive), sorted
pub fn find_images_in_directory(dir_path: &Path) -> Result<Vec<PathBuf>> {
    let mut image_files = Vec::new();

    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();
        if path.is_file() && is_supported_image_file(&path) {
            image_files.push(path);
        }
    }

    image_files.sort();
    Ok(image_files)
}

fn looks_like_glob(source: &str) -> bool {
    source.contains('*') || source.contains('?') || source.contains('[')
}

/// Report a problem with one source: an error in strict mode, a warning otherwise.
fn missing_source(config: &ImageInputConfig, message: String) -> Result<()> {
    if config.strict_mode {
        Err(anyhow::anyhow!(message))
    } else {
        log::warn!("{}{message}", symbols::warning());
        Ok(())
    }
}

/// Collect image files from files, directories or glob patterns.
///
/// The result is sorted and deduplicated.
pub fn collect_images_from_sources(
    sources: &[String],
    config: &ImageInputConfig,
) -> Result<Vec<PathBuf>> {
    let mut all_image_files = Vec::new();

    for source in sources {
        let source_path = Path::new(source);

        if source_path.is_file() {
            if is_supported_image_file(source_path) {
                all_image_files.push(source_path.to_path_buf());
            } else {
                missing_source(
                    config,
                    format!(
                        "File is not a supported image format: {}",
                        source_path.display()
                    ),
                )?;
            }
        } else if source_path.is_dir() {
            all_image_files.extend(find_images_in_directory(source_path)?);
        } else if !looks_like_glob(source) {
            missing_source(config, format!("File does not exist: {source}"))?;
        } else {
            match glob::glob(source) {
                Ok(paths) => {
                    let mut found_any = false;
                    for path_result in paths {
                        match path_result {
                            Ok(path) if path.is_file() && is_supported_image_file(&path) => {
                                all_image_files.push(path);
                                found_any = true;
                            }
                            Ok(_) => {}
                            Err(e) => {
                                log::warn!(
                                    "{}Error reading path in glob {source}: {e}",
                                    symbols::warning()
                                );
                            }
                        }
                    }
                    if !found_any && config.strict_mode {
                        return Err(anyhow::anyhow!(
                            "No image files found matching pattern: {source}"
                        ));
                    }
                }
                Err(_) => {
                    missing_source(
                        config,
                        format!(
                            "Source path does not exist and is not a valid glob pattern: {source}"
                        ),
                    )?;
                }
            }
        }
    }

    all_image_files.sort();
    all_image_files.dedup();

    if all_image_files.is_empty() && config.strict_mode {
        return Err(anyhow::anyhow!(
            "No image files found in the specified sources"
        ));
    }

    Ok(all_image_files)
}
