//! WAV output for the generated vowel files (32-bit float, mono).

use std::path::Path;

/// Write `samples` as a mono IEEE-float WAV file at `sample_rate` Hz,
/// replacing any existing file.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    log::debug!(
        "wrote {} samples @ {sample_rate} Hz to {}",
        samples.len(),
        path.display()
    );
    Ok(())
}
