// CLI command implementations
use crate::cli::output::OutputFormatter;

use oggflac::{OggFlacFile, OggStream, PropertyMap, ReadStyle, VorbisComment};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use log::warn;
use serde::Serialize;

type CliFile = OggFlacFile<OggStream<File>>;

#[derive(Serialize)]
struct PictureSummary {
    index: usize,
    picture_type: &'static str,
    mime_type: String,
    description: String,
    width: u32,
    height: u32,
    size: usize,
}

#[derive(Serialize)]
struct TagReport<'a> {
    file: String,
    vendor: &'a str,
    fields: PropertyMap,
    pictures: Vec<PictureSummary>,
}

#[derive(Serialize)]
struct InfoReport<'a> {
    file: String,
    layout: Option<oggflac::HeaderLayout>,
    has_vorbis_comment: bool,
    comment_packet: Option<usize>,
    stream_start: u64,
    stream_length: u64,
    properties: Option<&'a oggflac::Properties>,
}

/// Expand glob patterns, keeping plain paths as given
pub fn expand_files(patterns: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for pattern in patterns {
        if !pattern.contains(['*', '?', '[']) {
            files.push(PathBuf::from(pattern));
            continue;
        }

        match glob::glob(pattern) {
            Ok(paths) => {
                let before = files.len();
                files.extend(paths.filter_map(|entry| entry.map_err(|e| warn!("{}", e)).ok()));
                if files.len() == before {
                    warn!("Pattern {} matched no files", pattern);
                }
            }
            Err(e) => warn!("Invalid pattern {}: {}", pattern, e),
        }
    }

    files
}

fn open(path: &Path, read_properties: bool) -> anyhow::Result<CliFile> {
    let file = OggFlacFile::open_path(path, read_properties, ReadStyle::Average)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    if !file.is_valid() {
        bail!("{} is not a valid Ogg FLAC file", path.display());
    }

    Ok(file)
}

/// Run `action` on every file, reporting failures without stopping
fn for_each_file<F>(files: &[String], formatter: &OutputFormatter, mut action: F) -> anyhow::Result<()>
where
    F: FnMut(&Path) -> anyhow::Result<()>,
{
    let files = expand_files(files);
    if files.is_empty() {
        bail!("No files specified");
    }

    let mut failed = 0;
    for path in &files {
        if let Err(e) = action(path) {
            formatter.print_error(&format!("{:#}", e));
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{} of {} files failed", failed, files.len());
    }

    Ok(())
}

fn tag_report<'a>(path: &Path, tag: &'a VorbisComment, fields: Option<&[String]>) -> TagReport<'a> {
    let mut properties = tag.properties();
    if let Some(wanted) = fields {
        properties.retain(|key, _| wanted.iter().any(|w| w.eq_ignore_ascii_case(key)));
    }

    let pictures = tag
        .pictures()
        .iter()
        .enumerate()
        .map(|(index, picture)| PictureSummary {
            index,
            picture_type: picture.picture_type.as_str(),
            mime_type: picture.mime_type.clone(),
            description: picture.description.clone(),
            width: picture.width,
            height: picture.height,
            size: picture.data.len(),
        })
        .collect();

    TagReport {
        file: path.display().to_string(),
        vendor: tag.vendor(),
        fields: properties,
        pictures,
    }
}

/// Report whether files are Ogg FLAC
pub fn command_detect(files: &[String], formatter: &OutputFormatter) -> anyhow::Result<()> {
    for_each_file(files, formatter, |path| {
        let mut reader = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

        if !oggflac::is_supported(&mut reader)? {
            formatter.print_info(&format!("{}: not Ogg FLAC", path.display()));
            return Ok(());
        }

        let file = OggFlacFile::open(reader, false, ReadStyle::Fast)?;
        match file.scan_result().layout {
            Some(layout) if file.is_valid() => {
                formatter.print_info(&format!("{}: Ogg FLAC ({:?} layout)", path.display(), layout));
                Ok(())
            }
            _ => Err(anyhow!("{}: Ogg FLAC markers found but the stream is invalid", path.display())),
        }
    })
}

/// Print the Vorbis comment of files
pub fn command_read(
    files: &[String],
    fields: Option<&str>,
    output: Option<&str>,
    formatter: &OutputFormatter,
) -> anyhow::Result<()> {
    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path))?,
        )),
        None => Box::new(std::io::stdout()),
    };

    let fields: Option<Vec<String>> = fields.map(|f| f.split(',').map(|s| s.trim().to_string()).collect());

    for_each_file(files, formatter, |path| {
        let file = open(path, false)?;
        let tag = file.tag().ok_or_else(|| anyhow!("{} has no comment", path.display()))?;

        let report = serde_json::to_value(tag_report(path, tag, fields.as_deref()))?;
        formatter.output(&report, &mut *writer)
    })?;

    writer.flush()?;
    Ok(())
}

/// Print audio properties and scan facts
pub fn command_info(files: &[String], formatter: &OutputFormatter) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();

    for_each_file(files, formatter, |path| {
        let file = open(path, true)?;
        let scan = file.scan_result();

        let report = InfoReport {
            file: path.display().to_string(),
            layout: scan.layout,
            has_vorbis_comment: scan.has_comment,
            comment_packet: scan.has_comment.then_some(scan.comment_packet),
            stream_start: scan.stream_start,
            stream_length: scan.stream_length,
            properties: file.audio_properties(),
        };

        formatter.output(&serde_json::to_value(report)?, &mut stdout)
    })
}

/// Parse KEY=VALUE arguments, repeated keys collect several values
pub fn parse_assignments(assignments: &[String]) -> anyhow::Result<PropertyMap> {
    let mut map = PropertyMap::new();

    for assignment in assignments {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected KEY=VALUE, got {:?}", assignment))?;
        map.entry(key.to_ascii_uppercase()).or_default().push(value.to_string());
    }

    Ok(map)
}

/// Read a JSON object of KEY to a string or a list of strings
pub fn parse_json_fields(json: &str) -> anyhow::Result<PropertyMap> {
    let value: serde_json::Value = serde_json::from_str(json).context("Invalid JSON")?;
    let object = value.as_object().ok_or_else(|| anyhow!("Expected a JSON object"))?;

    let mut map = PropertyMap::new();
    for (key, value) in object {
        let values = match value {
            serde_json::Value::String(s) => vec![s.clone()],
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| anyhow!("Field {} must hold strings", key))?,
            other => vec![other.to_string()],
        };
        map.insert(key.to_ascii_uppercase(), values);
    }

    Ok(map)
}

/// Edit comment fields of one file and save it
pub fn command_write(
    file_path: &str,
    set: &[String],
    remove: &[String],
    from_file: Option<&str>,
    formatter: &OutputFormatter,
) -> anyhow::Result<()> {
    let mut updates = match from_file {
        Some(path) => {
            let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
            parse_json_fields(&json)?
        }
        None => PropertyMap::new(),
    };
    updates.extend(parse_assignments(set)?);

    if updates.is_empty() && remove.is_empty() {
        bail!("Nothing to write, use --set, --remove or --from-file");
    }

    let path = Path::new(file_path);
    let mut file = open(path, false)?;
    let tag = file.tag_mut().ok_or_else(|| anyhow!("{} has no comment", path.display()))?;

    for key in remove {
        tag.remove_fields(key);
    }

    for (key, values) in &updates {
        tag.remove_fields(key);
        for value in values {
            if !tag.add_field(key, value, false) {
                bail!("Invalid field name {:?}", key);
            }
        }
    }

    file.save().with_context(|| format!("Failed to save {}", path.display()))?;
    formatter.print_success(&format!("Updated metadata for {}", path.display()));

    Ok(())
}

/// Strip every picture from files
pub fn command_remove_pictures(files: &[String], formatter: &OutputFormatter) -> anyhow::Result<()> {
    for_each_file(files, formatter, |path| {
        let mut file = open(path, false)?;
        let removed = file.tag().map_or(0, |tag| tag.pictures().len());

        if removed == 0 {
            formatter.print_info(&format!("{}: no pictures", path.display()));
            return Ok(());
        }

        if let Some(tag) = file.tag_mut() {
            tag.remove_all_pictures();
        }
        file.save().with_context(|| format!("Failed to save {}", path.display()))?;

        formatter.print_success(&format!("Removed {} picture(s) from {}", removed, path.display()));
        Ok(())
    })
}

/// Write one embedded picture to a directory
pub fn command_export_cover(
    file_path: &str,
    output: &str,
    index: Option<usize>,
    formatter: &OutputFormatter,
) -> anyhow::Result<()> {
    let path = Path::new(file_path);
    let file = open(path, false)?;

    let pictures = file.tag().map(VorbisComment::pictures).unwrap_or_default();
    let index = index.unwrap_or(0);
    let picture = pictures
        .get(index)
        .ok_or_else(|| anyhow!("{} has {} picture(s), no index {}", path.display(), pictures.len(), index))?;

    std::fs::create_dir_all(output).with_context(|| format!("Failed to create {}", output))?;

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("cover");
    let target = Path::new(output).join(format!("{}-{}.{}", stem, index, picture.extension()));
    std::fs::write(&target, &picture.data).with_context(|| format!("Failed to write {}", target.display()))?;

    formatter.print_success(&format!("Exported {}", target.display()));
    Ok(())
}
