#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a minimal `.msg` file: root property stream, message class,
/// subject, plain text body and optional attachments.
pub fn write_msg(path: &Path, subject: &str, body: &str, attachments: &[(&str, &[u8])]) {
    let mut comp = cfb::create(path).unwrap();

    write_stream(&mut comp, "/__properties_version1.0", &[0u8; 32]);
    comp.create_storage("/__nameid_version1.0").unwrap();
    write_unicode(&mut comp, "/__substg1.0_001A001F", "IPM.Note");
    write_unicode(&mut comp, "/__substg1.0_0037001F", subject);
    write_unicode(&mut comp, "/__substg1.0_1000001F", body);

    for (index, (name, data)) in attachments.iter().enumerate() {
        let storage = format!("/__attach_version1.0_#{:08X}", index);
        comp.create_storage(&storage).unwrap();
        write_stream(
            &mut comp,
            &format!("{}/__properties_version1.0", storage),
            &[0u8; 8],
        );
        write_unicode(&mut comp, &format!("{}/__substg1.0_3707001F", storage), name);
        write_stream(&mut comp, &format!("{}/__substg1.0_37010102", storage), data);
    }

    comp.flush().unwrap();
}

fn write_unicode(comp: &mut cfb::CompoundFile<File>, path: &str, value: &str) {
    let bytes: Vec<u8> = value.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
    write_stream(comp, path, &bytes);
}

fn write_stream(comp: &mut cfb::CompoundFile<File>, path: &str, data: &[u8]) {
    let mut stream = comp.create_stream(path).unwrap();
    stream.write_all(data).unwrap();
    stream.flush().unwrap();
}
