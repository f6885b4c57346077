//! Voice-style table loaded from a NumPy `.npz` archive.
//!
//! Each archive entry `<voice>.npy` holds a little-endian `<f4`, C-order
//! tensor.  The first dimension indexes style rows (one per input length);
//! the remaining dimensions are flattened into the style vector, so both
//! `(510, 256)` and `(510, 1, 256)` layouts load the same way.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use zip::ZipArchive;

use super::engine::TtsError;

/// Upper bound on a single decompressed `.npy` entry.
const MAX_NPY_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

// ---------------------------------------------------------------------------
// VoiceStyle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct VoiceStyle {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl VoiceStyle {
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Length of one style vector.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Style vector `index`, clamped to the last row.
    pub fn row(&self, index: usize) -> &[f32] {
        if self.rows == 0 || self.cols == 0 {
            return &[];
        }
        let start = index.min(self.rows - 1) * self.cols;
        &self.data[start..start + self.cols]
    }
}

// ---------------------------------------------------------------------------
// VoiceTable
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct VoiceTable {
    voices: BTreeMap<String, VoiceStyle>,
}

impl VoiceTable {
    /// Read every `.npy` entry of the archive at `path`.
    ///
    /// # Errors
    ///
    /// - [`TtsError::VoicesNotFound`]: `path` does not exist.
    /// - [`TtsError::VoiceData`]: the archive or an entry is malformed, or
    ///   the archive holds no voices.
    pub fn load(path: &Path) -> Result<Self, TtsError> {
        if !path.exists() {
            return Err(TtsError::VoicesNotFound(path.display().to_string()));
        }
        let data_err = |e: String| TtsError::VoiceData(format!("{}: {e}", path.display()));

        let file = File::open(path).map_err(|e| data_err(e.to_string()))?;
        let mut archive = ZipArchive::new(file).map_err(|e| data_err(e.to_string()))?;

        let mut voices = BTreeMap::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|e| data_err(e.to_string()))?;
            let name = entry.name().to_string();
            let Some(key) = name.strip_suffix(".npy") else {
                continue;
            };
            let key = key.to_string();

            let mut raw = Vec::new();
            (&mut entry)
                .take(MAX_NPY_ENTRY_BYTES + 1)
                .read_to_end(&mut raw)
                .map_err(|e| data_err(e.to_string()))?;
            if raw.len() as u64 > MAX_NPY_ENTRY_BYTES {
                return Err(data_err(format!("entry '{name}' is too large")));
            }

            let style = parse_npy_f32(&raw).map_err(|e| data_err(format!("{name}: {e}")))?;
            voices.insert(key, style);
        }

        if voices.is_empty() {
            return Err(data_err("archive contains no .npy entries".into()));
        }
        log::debug!("loaded {} voices from {}", voices.len(), path.display());
        Ok(Self { voices })
    }

    pub fn names(&self) -> Vec<String> {
        self.voices.keys().cloned().collect()
    }

    pub fn style(&self, voice: &str) -> Result<&VoiceStyle, TtsError> {
        self.voices.get(voice).ok_or_else(|| TtsError::UnknownVoice {
            voice: voice.to_string(),
            available: self.names(),
        })
    }
}

// ---------------------------------------------------------------------------
// .npy decoding
// ---------------------------------------------------------------------------

/// Decode a version 1–3 `.npy` payload holding `<f4` data in C order.
pub fn parse_npy_f32(bytes: &[u8]) -> Result<VoiceStyle, String> {
    if bytes.len() < 10 || &bytes[0..6] != b"\x93NUMPY" {
        return Err("invalid npy magic header".into());
    }

    let (header_len, header_offset) = match bytes[6] {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 if bytes.len() >= 12 => (
            u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize,
            12,
        ),
        other => return Err(format!("unsupported npy version {other}")),
    };

    let header_end = header_offset + header_len;
    if bytes.len() < header_end {
        return Err("npy header length exceeds payload size".into());
    }
    let header = std::str::from_utf8(&bytes[header_offset..header_end])
        .map_err(|_| "npy header is not valid UTF-8".to_string())?;

    let descr = header_field(header, "descr").ok_or("npy header missing 'descr'")?;
    let fortran =
        header_field(header, "fortran_order").ok_or("npy header missing 'fortran_order'")?;
    let shape = parse_shape(header).ok_or("npy header missing 'shape'")?;

    if descr != "<f4" {
        return Err(format!("unsupported dtype '{descr}', expected '<f4'"));
    }
    if fortran != "False" {
        return Err("Fortran-ordered arrays are not supported".into());
    }
    let Some((&rows, rest)) = shape.split_first() else {
        return Err("scalar arrays are not voice styles".into());
    };
    let cols = rest
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or("npy shape overflow")?;
    let count = rows.checked_mul(cols).ok_or("npy shape overflow")?;

    let payload = &bytes[header_end..];
    if payload.len() != count * 4 {
        return Err(format!(
            "npy data size mismatch: expected {} bytes, got {}",
            count * 4,
            payload.len()
        ));
    }

    let data = payload
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(VoiceStyle { rows, cols, data })
}

fn header_field<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let pattern = format!("'{key}':");
    let start = header.find(&pattern)? + pattern.len();
    let rest = header[start..].trim_start();

    for quote in ['\'', '"'] {
        if let Some(stripped) = rest.strip_prefix(quote) {
            let end = stripped.find(quote)?;
            return Some(&stripped[..end]);
        }
    }

    let end = rest.find([',', '}']).unwrap_or(rest.len());
    Some(rest[..end].trim())
}

fn parse_shape(header: &str) -> Option<Vec<usize>> {
    let marker = "'shape':";
    let start = header.find(marker)? + marker.len();
    let rest = &header[start..];
    let open = rest.find('(')?;
    let close = rest[open..].find(')')? + open;

    rest[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| p.parse().ok())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn npy(shape: &str, values: &[f32]) -> Vec<u8> {
        let header = format!("{{'descr': '<f4', 'fortran_order': False, 'shape': {shape}, }}\n");
        let mut out = b"\x93NUMPY\x01\x00".to_vec();
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        for v in values {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    fn write_npz(path: &Path, entries: &[(&str, Vec<u8>)]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, bytes) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn parses_2d_tensor() {
        let style = parse_npy_f32(&npy("(2, 3)", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])).unwrap();
        assert_eq!(style.rows(), 2);
        assert_eq!(style.cols(), 3);
        assert_eq!(style.row(1), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn flattens_trailing_dimensions() {
        let values: Vec<f32> = (0..8).map(|i| i as f32).collect();
        let style = parse_npy_f32(&npy("(2, 1, 4)", &values)).unwrap();
        assert_eq!(style.cols(), 4);
        assert_eq!(style.row(0), &[0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn row_index_is_clamped() {
        let style = parse_npy_f32(&npy("(2, 2)", &[1.0, 2.0, 3.0, 4.0])).unwrap();
        assert_eq!(style.row(509), &[3.0, 4.0]);
    }

    #[test]
    fn rejects_wrong_dtype_and_size() {
        let mut bad = npy("(1, 2)", &[1.0, 2.0]);
        let pos = bad.windows(3).position(|w| w == b"<f4").unwrap();
        bad[pos + 2] = b'8';
        assert!(parse_npy_f32(&bad).unwrap_err().contains("dtype"));

        let short = npy("(2, 2)", &[1.0, 2.0]);
        assert!(parse_npy_f32(&short).unwrap_err().contains("mismatch"));

        assert!(parse_npy_f32(b"not a numpy file").is_err());
    }

    #[test]
    fn loads_archive_and_lists_voices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voices.npz");
        write_npz(
            &path,
            &[
                ("am_fenrir.npy", npy("(1, 2)", &[0.5, 0.6])),
                ("af_heart.npy", npy("(1, 2)", &[0.1, 0.2])),
                ("README.txt", b"ignored".to_vec()),
            ],
        );

        let table = VoiceTable::load(&path).unwrap();
        assert_eq!(table.names(), vec!["af_heart", "am_fenrir"]);
        assert!(table.style("af_heart").is_ok());
        assert_eq!(table.style("am_fenrir").unwrap().row(0), &[0.5, 0.6]);
    }

    #[test]
    fn unknown_voice_lists_available() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voices.npz");
        write_npz(&path, &[("af_heart.npy", npy("(1, 1)", &[0.0]))]);

        let table = VoiceTable::load(&path).unwrap();
        assert_eq!(
            table.style("zz_nobody").unwrap_err(),
            TtsError::UnknownVoice {
                voice: "zz_nobody".into(),
                available: vec!["af_heart".into()],
            }
        );
    }

    #[test]
    fn missing_archive_is_voices_not_found() {
        let err = VoiceTable::load(Path::new("/nonexistent/voices.npz")).unwrap_err();
        assert!(matches!(err, TtsError::VoicesNotFound(_)));
    }

    #[test]
    fn empty_archive_is_voice_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voices.npz");
        write_npz(&path, &[("notes.txt", b"x".to_vec())]);
        assert!(matches!(
            VoiceTable::load(&path).unwrap_err(),
            TtsError::VoiceData(_)
        ));
    }
}
