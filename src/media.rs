//! Media file classification by extension
//!
//! Lists follow what the player itself recognises, so the bridge can warn
//! before handing it something it will refuse.

use std::path::Path;

const AUDIO_EXTENSIONS: &[&str] = &[
    "3ga", "669", "a52", "aac", "ac3", "adt", "adts", "aif", "aifc", "aiff", "amb", "amr", "aob",
    "ape", "au", "awb", "caf", "dts", "dsf", "dff", "flac", "it", "kar", "m4a", "m4b", "m4p",
    "m5p", "mid", "mka", "mlp", "mod", "mpa", "mp1", "mp2", "mp3", "mpc", "mpga", "mus", "oga",
    "ogg", "oma", "opus", "qcp", "ra", "rmi", "s3m", "sid", "spx", "tak", "thd", "tta", "voc",
    "vqf", "w64", "wav", "wma", "wv", "xa", "xm",
];

const VIDEO_EXTENSIONS: &[&str] = &[
    "3g2", "3gp", "3gp2", "3gpp", "amv", "asf", "avi", "bik", "bin", "crf", "divx", "drc", "dv",
    "dvr-ms", "evo", "f4v", "flv", "gvi", "gxf", "iso", "m1v", "m2v", "m2t", "m2ts", "m4v", "mkv",
    "mov", "mp2", "mp2v", "mp4", "mp4v", "mpe", "mpeg", "mpeg1", "mpeg2", "mpeg4", "mpg", "mpv2",
    "mts", "mtv", "mxf", "mxg", "nsv", "nuv", "ogg", "ogm", "ogv", "ogx", "ps", "rec", "rm",
    "rmvb", "rpl", "thp", "tod", "tp", "ts", "tts", "txd", "vob", "vro", "webm", "wm", "wmv",
    "wtv", "xesc",
];

/// Subtitle formats the player can load as a track. The transcript parser
/// only understands a subset, see `subtitle::SubtitleFormat`.
const SUBTITLE_EXTENSIONS: &[&str] = &[
    "aqt", "usf", "txt", "svcd", "idx", "sub", "ssa", "ass", "srt", "smi", "rt", "pjs", "mpl",
    "jss", "dks", "cvd", "ttxt", "ssf", "psb", "cdg", "utf", "sami", "smil", "stl", "mpl2", "mks",
    "vtt", "tt", "ttml", "dfxp", "scc",
];

/// Kind of file, as far as the player is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
    Subtitle,
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Classify a file by its extension. Containers that can hold either audio or
/// video (ogg, mp2) are reported as video.
pub fn classify<P: AsRef<Path>>(path: P) -> Option<MediaKind> {
    let ext = extension_of(path.as_ref())?;
    if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Audio)
    } else if SUBTITLE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Subtitle)
    } else {
        None
    }
}

/// True for anything the player can open as a media item
pub fn is_playable<P: AsRef<Path>>(path: P) -> bool {
    matches!(classify(path), Some(MediaKind::Video) | Some(MediaKind::Audio))
}

/// Turn a `file://` URI from the player into a local path. Anything else
/// is returned unchanged.
pub fn uri_to_path(uri: &str) -> String {
    let Some(rest) = uri.strip_prefix("file://") else {
        return uri.to_string();
    };
    let decoded = urlencoding::decode(rest)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| rest.to_string());
    // "/C:/Videos/a.mkv" is a drive path
    let bytes = decoded.as_bytes();
    if bytes.len() > 2 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':' {
        decoded[1..].to_string()
    } else {
        decoded
    }
}
