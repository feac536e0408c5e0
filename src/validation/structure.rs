use super::{ValidationResult, Validator};
use crate::engine::msg::{
    substg_path, ATTACH_PREFIX, CHILD_PROPERTY_HEADER, NAMEID_STORAGE, PROPERTIES_STREAM,
    PROPERTY_ENTRY, PR_MESSAGE_CLASS, PT_STRING8, PT_UNICODE, RECIP_PREFIX, ROOT_PROPERTY_HEADER,
};
use cfb::CompoundFile;
use std::fs::File;
use std::io;
use std::path::Path;

/// Checks the storage and stream layout of a `.msg` file.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgValidator;

impl Validator for MsgValidator {
    fn validate(&self, path: &Path) -> ValidationResult {
        let comp = match cfb::open(path) {
            Ok(comp) => comp,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof
                ) =>
            {
                return ValidationResult::failed(format!("not a compound file: {}", e));
            }
            Err(e) => return ValidationResult::failed(format!("cannot read file: {}", e)),
        };

        let mut result = ValidationResult::passed();
        count_entries(&comp, &mut result);
        check_property_stream(&comp, "", ROOT_PROPERTY_HEADER, &mut result);

        let children: Vec<String> = match comp.read_storage("/") {
            Ok(entries) => entries
                .filter(|entry| entry.is_storage())
                .map(|entry| entry.name().to_string())
                .collect(),
            Err(e) => {
                result.fail(format!("cannot list root storage: {}", e));
                return result;
            }
        };

        for name in &children {
            if name.starts_with(ATTACH_PREFIX) {
                result.attachments += 1;
            } else if name.starts_with(RECIP_PREFIX) {
                result.recipients += 1;
            } else {
                continue;
            }
            check_property_stream(&comp, &format!("/{}", name), CHILD_PROPERTY_HEADER, &mut result);
        }

        if !comp.is_storage(format!("/{}", NAMEID_STORAGE)) {
            result.warn("named property storage is missing");
        }

        if !has_message_class(&comp) {
            result.warn("message class is missing");
        }

        tracing::debug!(
            file = %path.display(),
            streams = result.streams,
            storages = result.storages,
            errors = result.errors.len(),
            "Checked container structure"
        );

        result
    }
}

fn count_entries(comp: &CompoundFile<File>, result: &mut ValidationResult) {
    for entry in comp.walk() {
        if entry.is_root() {
            continue;
        }
        if entry.is_stream() {
            result.streams += 1;
        } else if entry.is_storage() {
            result.storages += 1;
        }
    }
}

// Property streams are a fixed header followed by 16 byte entries.
fn check_property_stream(
    comp: &CompoundFile<File>,
    storage: &str,
    header: usize,
    result: &mut ValidationResult,
) {
    let path = format!("{}/{}", storage, PROPERTIES_STREAM);
    let location = if storage.is_empty() { "/" } else { storage };

    if !comp.is_stream(&path) {
        result.fail(format!("{}: property stream is missing", location));
        return;
    }

    match comp.entry(&path) {
        Ok(entry) => {
            let len = entry.len() as usize;
            if len < header || (len - header) % PROPERTY_ENTRY != 0 {
                result.fail(format!(
                    "{}: property stream has invalid length {} (expected {} + {}n)",
                    location, len, header, PROPERTY_ENTRY
                ));
            }
        }
        Err(e) => result.fail(format!("{}: cannot read property stream: {}", location, e)),
    }
}

fn has_message_class(comp: &CompoundFile<File>) -> bool {
    comp.is_stream(substg_path("", PR_MESSAGE_CLASS, PT_UNICODE))
        || comp.is_stream(substg_path("", PR_MESSAGE_CLASS, PT_STRING8))
}
