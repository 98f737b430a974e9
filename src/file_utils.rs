use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Find files with one of `extensions` under a directory, sorted
    pub fn find_files<P: AsRef<Path>>(dir: P, extensions: &[String]) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() && has_extension(path, extensions) {
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    /// Expand the command line inputs: files as given, directories walked
    pub fn collect_inputs(inputs: &[PathBuf], extensions: &[String]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for input in inputs {
            if Self::dir_exists(input) {
                files.extend(Self::find_files(input, extensions)?);
            } else if Self::file_exists(input) {
                files.push(input.clone());
            } else {
                return Err(anyhow!("Input does not exist: {:?}", input));
            }
        }
        Ok(files)
    }

    // @generates: Output path mirroring the input below the output directory
    pub fn generate_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
    ) -> PathBuf {
        let input_file = input_file.as_ref();
        let relative = if input_file.is_absolute() {
            input_file
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_default()
        } else {
            input_file
                .components()
                .filter(|component| matches!(component, std::path::Component::Normal(_)))
                .collect()
        };
        output_dir.as_ref().join(relative)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Read an XML document, decoding it from its BOM or declared encoding
    pub fn read_document<P: AsRef<Path>>(path: P) -> Result<String> {
        let bytes = fs::read(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))?;
        Ok(decode_document(&bytes))
    }

    /// Write an XML document with the encoding named in its declaration
    pub fn write_document<P: AsRef<Path>>(
        path: P,
        content: &str,
        encoding: Option<&str>,
    ) -> Result<()> {
        let bytes = encode_document(content, encoding);
        Self::write_bytes(path, &bytes)
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        Self::write_bytes(path, content.as_bytes())
    }

    fn write_bytes<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension().is_some_and(|ext| {
        let ext = ext.to_string_lossy();
        extensions
            .iter()
            .any(|wanted| ext.eq_ignore_ascii_case(wanted.trim_start_matches('.')))
    })
}

/// Decode document bytes: BOM first, then the XML declaration, then UTF-8
pub fn decode_document(bytes: &[u8]) -> String {
    if let Some((encoding, bom_length)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_length..]);
        return text.into_owned();
    }

    let encoding = declared_encoding(bytes)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _) = encoding.decode_without_bom_handling(bytes);
    text.into_owned()
}

/// Encode a document with the encoding named by `label`, UTF-8 when unknown
pub fn encode_document(content: &str, label: Option<&str>) -> Vec<u8> {
    let encoding = label
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .unwrap_or(UTF_8);
    let (bytes, _, unmappable) = encoding.encode(content);
    if unmappable {
        warn!(
            "Some characters are not representable in {}, written as character references",
            encoding.name()
        );
    }
    bytes.into_owned()
}

// The declaration is ASCII in every encoding we decode
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(256)];
    let head = String::from_utf8_lossy(head);
    let declaration = head.strip_prefix("<?xml")?;
    let declaration = &declaration[..declaration.find("?>")?];
    let (_, rest) = declaration.split_once("encoding")?;
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    Some(value[..value.find(quote)?].to_string())
}
