use super::render::{prepare_html, render_pdf, text_document, text_to_html};
use super::rtf;
use super::sink::{sanitize_filename, OutputSink};
use super::{BodyFormat, ExtractionEngine, MessageHandle, ParserOptions, SaveOptions};
use crate::error::{MsgExtractError, Result};
use cfb::CompoundFile;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

pub(crate) const PROPERTIES_STREAM: &str = "__properties_version1.0";
pub(crate) const NAMEID_STORAGE: &str = "__nameid_version1.0";
pub(crate) const ATTACH_PREFIX: &str = "__attach_version1.0_#";
pub(crate) const RECIP_PREFIX: &str = "__recip_version1.0_#";
const SUBSTG_PREFIX: &str = "__substg1.0_";

// Top-level property stream: 32 byte header, then 16 byte entries.
pub(crate) const ROOT_PROPERTY_HEADER: usize = 32;
pub(crate) const CHILD_PROPERTY_HEADER: usize = 8;
pub(crate) const PROPERTY_ENTRY: usize = 16;

pub(crate) const PT_STRING8: u16 = 0x001E;
pub(crate) const PT_UNICODE: u16 = 0x001F;
const PT_SYSTIME: u16 = 0x0040;
const PT_OBJECT: u16 = 0x000D;
const PT_BINARY: u16 = 0x0102;

pub(crate) const PR_MESSAGE_CLASS: u16 = 0x001A;
const PR_SUBJECT: u16 = 0x0037;
const PR_CLIENT_SUBMIT_TIME: u16 = 0x0039;
const PR_SENDER_NAME: u16 = 0x0C1A;
const PR_SENDER_EMAIL: u16 = 0x0C1F;
const PR_DISPLAY_CC: u16 = 0x0E03;
const PR_DISPLAY_TO: u16 = 0x0E04;
const PR_MESSAGE_DELIVERY_TIME: u16 = 0x0E06;
const PR_BODY: u16 = 0x1000;
const PR_RTF_COMPRESSED: u16 = 0x1009;
const PR_HTML: u16 = 0x1013;
const PR_DISPLAY_NAME: u16 = 0x3001;
const PR_ATTACH_DATA: u16 = 0x3701;
const PR_ATTACH_FILENAME: u16 = 0x3704;
const PR_ATTACH_LONG_FILENAME: u16 = 0x3707;
const PR_ATTACH_CONTENT_ID: u16 = 0x3712;

// Seconds between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_OFFSET: i64 = 11_644_473_600;

/// Default engine: opens `.msg` files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgEngine;

impl ExtractionEngine for MsgEngine {
    type Handle = MsgFile;

    fn open(&self, path: &Path, options: &ParserOptions) -> Result<MsgFile> {
        MsgFile::open(path, options)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    storage: String,
    pub filename: Option<String>,
    pub content_id: Option<String>,
    pub embedded: bool,
}

impl Attachment {
    fn output_name(&self, index: usize, use_content_id: bool) -> String {
        let preferred = if use_content_id {
            self.content_id.as_ref().or(self.filename.as_ref())
        } else {
            self.filename.as_ref()
        };

        match preferred {
            Some(name) => sanitize_filename(name, &format!("attachment{}", index)),
            None => format!("attachment{}", index),
        }
    }
}

/// An opened `.msg` file. The underlying file is closed when it is dropped.
pub struct MsgFile {
    path: PathBuf,
    cfb: CompoundFile<File>,
    subject: Option<String>,
    sender: Option<String>,
    to: Option<String>,
    cc: Option<String>,
    date: Option<DateTime<Utc>>,
    message_class: Option<String>,
    body: String,
    html: Option<String>,
    rtf: Option<Vec<u8>>,
    attachments: Vec<Attachment>,
}

#[derive(Serialize)]
struct JsonMessage<'a> {
    from: Option<&'a str>,
    to: Option<&'a str>,
    cc: Option<&'a str>,
    subject: Option<&'a str>,
    date: Option<String>,
    message_class: Option<&'a str>,
    body: &'a str,
    attachments: Vec<String>,
}

impl MsgFile {
    pub fn open(path: &Path, options: &ParserOptions) -> Result<Self> {
        let mut cfb = cfb::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
                MsgExtractError::InvalidContainer {
                    path: path.display().to_string(),
                    source: e,
                }
            }
            _ => MsgExtractError::Io(e),
        })?;

        let subject = read_string(&mut cfb, "", PR_SUBJECT)?;
        let sender_name = read_string(&mut cfb, "", PR_SENDER_NAME)?;
        let sender_email = read_string(&mut cfb, "", PR_SENDER_EMAIL)?;
        let sender = match (sender_name, sender_email) {
            (Some(name), Some(email)) if name != email => Some(format!("{} <{}>", name, email)),
            (Some(name), _) => Some(name),
            (None, email) => email,
        };
        let to = read_string(&mut cfb, "", PR_DISPLAY_TO)?;
        let cc = read_string(&mut cfb, "", PR_DISPLAY_CC)?;
        let message_class = read_string(&mut cfb, "", PR_MESSAGE_CLASS)?;
        let body = read_string(&mut cfb, "", PR_BODY)?.unwrap_or_default();

        let html = match read_binary(&mut cfb, "", PR_HTML)? {
            Some(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            None => read_string(&mut cfb, "", PR_HTML)?,
        };

        let rtf = match read_binary(&mut cfb, "", PR_RTF_COMPRESSED)? {
            Some(compressed) => match rtf::decompress(&compressed) {
                Ok(decoded) => Some(decoded),
                Err(e) if options.ignore_rtf_de_errors => {
                    tracing::warn!(file = %path.display(), error = %e, "Ignoring undecodable RTF body");
                    None
                }
                Err(e) => return Err(e),
            },
            None => None,
        };

        let date = read_date(&mut cfb)?;
        let attachments = read_attachments(&mut cfb)?;

        tracing::debug!(
            file = %path.display(),
            attachments = attachments.len(),
            has_html = html.is_some(),
            has_rtf = rtf.is_some(),
            "Opened message"
        );

        Ok(Self {
            path: path.to_path_buf(),
            cfb,
            subject,
            sender,
            to,
            cc,
            date,
            message_class,
            body,
            html,
            rtf,
            attachments,
        })
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = Vec::new();
        if let Some(ref sender) = self.sender {
            headers.push(("From", sender.clone()));
        }
        if let Some(ref to) = self.to {
            headers.push(("To", to.clone()));
        }
        if let Some(ref cc) = self.cc {
            headers.push(("CC", cc.clone()));
        }
        if let Some(ref subject) = self.subject {
            headers.push(("Subject", subject.clone()));
        }
        if let Some(date) = self.date {
            headers.push(("Date", date.to_rfc2822()));
        }
        headers
    }

    fn folder_name(&self, options: &SaveOptions) -> String {
        if let Some(ref custom) = options.custom_filename {
            return sanitize_filename(custom, "UnknownSubject");
        }

        if options.use_msg_filename {
            let stem = self
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            return sanitize_filename(&stem, "UnknownSubject");
        }

        sanitize_filename(self.subject.as_deref().unwrap_or(""), "UnknownSubject")
    }

    /// Resolves the requested body format, applying the fallback chain.
    fn body_file(&self, options: &SaveOptions) -> Result<(String, Vec<u8>)> {
        let headers = self.headers();
        let mut format = options.format;

        loop {
            let rendered = match format {
                BodyFormat::Text => Some(text_document(&headers, &self.body).into_bytes()),
                BodyFormat::Json => Some(serde_json::to_vec_pretty(&self.json_message())?),
                BodyFormat::Html => self.html.as_ref().map(|html| {
                    if options.prepared_html {
                        prepare_html(html, &headers, &options.charset).into_bytes()
                    } else {
                        html.clone().into_bytes()
                    }
                }),
                BodyFormat::Rtf => self.rtf.clone(),
                BodyFormat::Pdf => {
                    let html = match self.html {
                        Some(ref html) => Some(prepare_html(html, &headers, &options.charset)),
                        None if options.allow_fallback => {
                            Some(text_to_html(&self.body, &headers, &options.charset))
                        }
                        None => None,
                    };
                    match html {
                        Some(html) => Some(render_pdf(
                            &html,
                            options.wk_path.as_deref(),
                            &options.wk_options,
                        )?),
                        None => None,
                    }
                }
            };

            if let Some(bytes) = rendered {
                return Ok((format.file_name().to_string(), bytes));
            }

            let missing = match format {
                BodyFormat::Rtf => "an RTF body",
                _ => "an HTML body",
            };
            if !options.allow_fallback {
                return Err(MsgExtractError::MissingData {
                    what: missing.to_string(),
                });
            }

            tracing::info!(file = %self.path.display(), "Message has no {}, falling back", missing);
            format = match format {
                BodyFormat::Rtf => BodyFormat::Html,
                _ => BodyFormat::Text,
            };
        }
    }

    fn json_message(&self) -> JsonMessage<'_> {
        JsonMessage {
            from: self.sender.as_deref(),
            to: self.to.as_deref(),
            cc: self.cc.as_deref(),
            subject: self.subject.as_deref(),
            date: self.date.map(|d| d.to_rfc2822()),
            message_class: self.message_class.as_deref(),
            body: &self.body,
            attachments: self
                .attachments
                .iter()
                .enumerate()
                .filter(|(_, a)| !a.embedded)
                .map(|(i, a)| a.output_name(i, false))
                .collect(),
        }
    }
}

impl MessageHandle for MsgFile {
    fn primary_text(&self) -> &str {
        &self.body
    }

    fn save(&mut self, options: &SaveOptions) -> Result<PathBuf> {
        // Render before touching the destination so a missing body leaves nothing behind.
        let body = if options.attachments_only {
            None
        } else {
            Some(self.body_file(options)?)
        };

        let mut sink = OutputSink::open(&options.target, &self.folder_name(options))?;

        if let Some((name, bytes)) = body {
            sink.write_file(&name, &bytes)?;
        }

        for (index, attachment) in self.attachments.iter().enumerate() {
            if attachment.embedded {
                tracing::warn!(
                    file = %self.path.display(),
                    attachment = index,
                    "Skipping embedded message attachment"
                );
                continue;
            }

            let data = read_binary(&mut self.cfb, &attachment.storage, PR_ATTACH_DATA)?
                .unwrap_or_default();
            let stored = sink.write_file(&attachment.output_name(index, options.content_id), &data)?;
            tracing::debug!(file = %self.path.display(), attachment = %stored, "Saved attachment");
        }

        sink.finish()
    }
}

pub(crate) fn substg_path(storage: &str, prop: u16, prop_type: u16) -> String {
    format!("{}/{}{:04X}{:04X}", storage, SUBSTG_PREFIX, prop, prop_type)
}

fn read_stream(cfb: &mut CompoundFile<File>, path: &str) -> Result<Option<Vec<u8>>> {
    if !cfb.is_stream(path) {
        return Ok(None);
    }

    let mut data = Vec::new();
    cfb.open_stream(path)?.read_to_end(&mut data)?;
    Ok(Some(data))
}

fn read_binary(cfb: &mut CompoundFile<File>, storage: &str, prop: u16) -> Result<Option<Vec<u8>>> {
    read_stream(cfb, &substg_path(storage, prop, PT_BINARY))
}

fn read_string(cfb: &mut CompoundFile<File>, storage: &str, prop: u16) -> Result<Option<String>> {
    if let Some(bytes) = read_stream(cfb, &substg_path(storage, prop, PT_UNICODE))? {
        return Ok(Some(decode_utf16le(&bytes)));
    }

    Ok(read_stream(cfb, &substg_path(storage, prop, PT_STRING8))?
        .map(|bytes| String::from_utf8_lossy(&bytes).trim_end_matches('\0').to_string()))
}

fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
        .trim_end_matches('\0')
        .to_string()
}

fn read_date(cfb: &mut CompoundFile<File>) -> Result<Option<DateTime<Utc>>> {
    let Some(properties) = read_stream(cfb, &format!("/{}", PROPERTIES_STREAM))? else {
        return Ok(None);
    };

    let mut submit = None;
    let mut delivery = None;

    if properties.len() > ROOT_PROPERTY_HEADER {
        for entry in properties[ROOT_PROPERTY_HEADER..].chunks_exact(PROPERTY_ENTRY) {
            let tag = u32::from_le_bytes([entry[0], entry[1], entry[2], entry[3]]);
            if (tag & 0xFFFF) as u16 != PT_SYSTIME {
                continue;
            }

            let mut value = [0u8; 8];
            value.copy_from_slice(&entry[8..16]);
            let filetime = u64::from_le_bytes(value);

            match (tag >> 16) as u16 {
                PR_CLIENT_SUBMIT_TIME => submit = filetime_to_datetime(filetime),
                PR_MESSAGE_DELIVERY_TIME => delivery = filetime_to_datetime(filetime),
                _ => {}
            }
        }
    }

    Ok(submit.or(delivery))
}

fn filetime_to_datetime(filetime: u64) -> Option<DateTime<Utc>> {
    if filetime == 0 {
        return None;
    }
    let secs = (filetime / 10_000_000) as i64 - FILETIME_UNIX_OFFSET;
    let nanos = ((filetime % 10_000_000) * 100) as u32;
    DateTime::from_timestamp(secs, nanos)
}

fn read_attachments(cfb: &mut CompoundFile<File>) -> Result<Vec<Attachment>> {
    let mut storages: Vec<String> = cfb
        .read_storage("/")?
        .filter(|entry| entry.is_storage() && entry.name().starts_with(ATTACH_PREFIX))
        .map(|entry| format!("/{}", entry.name()))
        .collect();
    storages.sort();

    let mut attachments = Vec::with_capacity(storages.len());
    for storage in storages {
        let filename = match read_string(cfb, &storage, PR_ATTACH_LONG_FILENAME)? {
            Some(name) if !name.is_empty() => Some(name),
            _ => match read_string(cfb, &storage, PR_ATTACH_FILENAME)? {
                Some(name) if !name.is_empty() => Some(name),
                _ => read_string(cfb, &storage, PR_DISPLAY_NAME)?,
            },
        };
        let content_id = read_string(cfb, &storage, PR_ATTACH_CONTENT_ID)?
            .filter(|cid| !cid.is_empty());
        let embedded = cfb.is_storage(substg_path(&storage, PR_ATTACH_DATA, PT_OBJECT));

        attachments.push(Attachment {
            storage,
            filename,
            content_id,
            embedded,
        });
    }

    Ok(attachments)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use std::io::Write;

    /// Builds small but well-formed `.msg` files for tests.
    #[derive(Default)]
    pub(crate) struct MsgBuilder {
        pub subject: Option<String>,
        pub sender: Option<String>,
        pub body: Option<String>,
        pub html: Option<String>,
        pub rtf: Option<Vec<u8>>,
        pub submit_time: Option<u64>,
        pub attachments: Vec<(String, Option<String>, Vec<u8>)>,
    }

    impl MsgBuilder {
        pub fn new(subject: &str, body: &str) -> Self {
            Self {
                subject: Some(subject.to_string()),
                body: Some(body.to_string()),
                ..Default::default()
            }
        }

        pub fn attachment(mut self, name: &str, content_id: Option<&str>, data: &[u8]) -> Self {
            self.attachments
                .push((name.to_string(), content_id.map(str::to_string), data.to_vec()));
            self
        }

        pub fn write(&self, path: &Path) {
            let mut comp = cfb::create(path).unwrap();

            let mut properties = vec![0u8; ROOT_PROPERTY_HEADER];
            if let Some(filetime) = self.submit_time {
                let tag = ((PR_CLIENT_SUBMIT_TIME as u32) << 16) | PT_SYSTIME as u32;
                properties.extend_from_slice(&tag.to_le_bytes());
                properties.extend_from_slice(&0u32.to_le_bytes());
                properties.extend_from_slice(&filetime.to_le_bytes());
            }
            write_stream(&mut comp, &format!("/{}", PROPERTIES_STREAM), &properties);
            comp.create_storage(format!("/{}", NAMEID_STORAGE)).unwrap();

            write_unicode(&mut comp, "", PR_MESSAGE_CLASS, "IPM.Note");
            if let Some(ref subject) = self.subject {
                write_unicode(&mut comp, "", PR_SUBJECT, subject);
            }
            if let Some(ref sender) = self.sender {
                write_unicode(&mut comp, "", PR_SENDER_NAME, sender);
            }
            if let Some(ref body) = self.body {
                write_unicode(&mut comp, "", PR_BODY, body);
            }
            if let Some(ref html) = self.html {
                write_stream(&mut comp, &substg_path("", PR_HTML, PT_BINARY), html.as_bytes());
            }
            if let Some(ref rtf) = self.rtf {
                write_stream(&mut comp, &substg_path("", PR_RTF_COMPRESSED, PT_BINARY), rtf);
            }

            for (index, (name, content_id, data)) in self.attachments.iter().enumerate() {
                let storage = format!("/{}{:08X}", ATTACH_PREFIX, index);
                comp.create_storage(&storage).unwrap();
                write_stream(
                    &mut comp,
                    &format!("{}/{}", storage, PROPERTIES_STREAM),
                    &[0u8; CHILD_PROPERTY_HEADER],
                );
                write_unicode(&mut comp, &storage, PR_ATTACH_LONG_FILENAME, name);
                if let Some(cid) = content_id {
                    write_unicode(&mut comp, &storage, PR_ATTACH_CONTENT_ID, cid);
                }
                write_stream(&mut comp, &substg_path(&storage, PR_ATTACH_DATA, PT_BINARY), data);
            }

            comp.flush().unwrap();
        }
    }

    fn write_unicode(comp: &mut CompoundFile<File>, storage: &str, prop: u16, value: &str) {
        let bytes: Vec<u8> = value.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        write_stream(comp, &substg_path(storage, prop, PT_UNICODE), &bytes);
    }

    pub(crate) fn write_stream(comp: &mut CompoundFile<File>, path: &str, data: &[u8]) {
        let mut stream = comp.create_stream(path).unwrap();
        stream.write_all(data).unwrap();
        stream.flush().unwrap();
    }
}
