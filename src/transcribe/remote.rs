//! Remote speech-to-text transcription via OpenAI-compatible API
//!
//! Wraps the captured PCM bytes in a WAV container and sends them as
//! multipart/form-data to a `/v1/audio/transcriptions` endpoint. The
//! endpoint, API key, model, and prompt come from configuration and are
//! forwarded opaquely.

use super::Transcriber;
use crate::config::TranscribeConfig;
use crate::error::TranscribeError;
use std::io::Cursor;
use std::time::Duration;

/// Remote transcriber using an OpenAI-compatible transcription API
#[derive(Debug)]
pub struct RemoteTranscriber {
    /// Base endpoint URL (e.g., "https://api.openai.com")
    endpoint: String,
    /// Model name to send to the server
    model: String,
    /// Optional vocabulary-biasing prompt
    prompt: Option<String>,
    /// Optional API key for bearer authentication
    api_key: Option<String>,
    /// Sample rate of the PCM bytes being handed in
    sample_rate: u32,
    /// Request timeout
    timeout: Duration,
}

impl RemoteTranscriber {
    /// Create a new remote transcriber from config
    pub fn new(config: &TranscribeConfig, sample_rate: u32) -> Result<Self, TranscribeError> {
        let endpoint = config.endpoint.clone();

        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(TranscribeError::ConfigError(format!(
                "endpoint must start with http:// or https://, got: {}",
                endpoint
            )));
        }

        if endpoint.starts_with("http://")
            && !endpoint.contains("localhost")
            && !endpoint.contains("127.0.0.1")
            && !endpoint.contains("[::1]")
        {
            tracing::warn!(
                "Transcription endpoint uses HTTP without TLS. Audio will be transmitted unencrypted!"
            );
        }

        tracing::info!(
            "Configured remote transcriber: endpoint={}, model={}, timeout={}s",
            endpoint,
            config.model,
            config.timeout_secs
        );

        Ok(Self {
            endpoint,
            model: config.model.clone(),
            prompt: config.prompt.clone(),
            api_key: config.api_key.clone(),
            sample_rate,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// Wrap s16le PCM bytes in a WAV container
    fn encode_wav(&self, pcm: &[u8]) -> Result<Vec<u8>, TranscribeError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut buffer = Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut buffer, spec).map_err(|e| {
            TranscribeError::AudioFormat(format!("Failed to create WAV writer: {}", e))
        })?;

        // A ring hand-off can slice mid-sample; drop a trailing odd byte.
        let usable = pcm.len() - (pcm.len() % 2);
        if usable < pcm.len() {
            tracing::debug!("Dropping trailing odd byte from PCM segment");
        }

        for pair in pcm[..usable].chunks_exact(2) {
            let sample = i16::from_le_bytes([pair[0], pair[1]]);
            writer.write_sample(sample).map_err(|e| {
                TranscribeError::AudioFormat(format!("Failed to write sample: {}", e))
            })?;
        }

        writer
            .finalize()
            .map_err(|e| TranscribeError::AudioFormat(format!("Failed to finalize WAV: {}", e)))?;

        Ok(buffer.into_inner())
    }

    /// Build the multipart form body for the API request
    fn build_multipart_body(&self, wav_data: &[u8]) -> (String, Vec<u8>) {
        let boundary = format!(
            "----KeyvoxBoundary{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );

        let mut body = Vec::new();

        // File field
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"file\"; filename=\"audio.wav\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: audio/wav\r\n\r\n");
        body.extend_from_slice(wav_data);
        body.extend_from_slice(b"\r\n");

        // Model field
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"model\"\r\n\r\n");
        body.extend_from_slice(self.model.as_bytes());
        body.extend_from_slice(b"\r\n");

        // Prompt field (optional)
        if let Some(ref prompt) = self.prompt {
            body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            body.extend_from_slice(b"Content-Disposition: form-data; name=\"prompt\"\r\n\r\n");
            body.extend_from_slice(prompt.as_bytes());
            body.extend_from_slice(b"\r\n");
        }

        // Response format field
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"response_format\"\r\n\r\n");
        body.extend_from_slice(b"json\r\n");

        // End boundary
        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

        (boundary, body)
    }
}

impl Transcriber for RemoteTranscriber {
    fn transcribe(&self, pcm: &[u8]) -> Result<String, TranscribeError> {
        if pcm.is_empty() {
            return Err(TranscribeError::AudioFormat("Empty audio segment".into()));
        }

        let duration_secs = pcm.len() as f32 / (self.sample_rate as f32 * 2.0);
        tracing::debug!(
            "Sending {:.2}s of audio to remote server ({} bytes)",
            duration_secs,
            pcm.len()
        );

        let start = std::time::Instant::now();

        let wav_data = self.encode_wav(pcm)?;
        let (boundary, body) = self.build_multipart_body(&wav_data);

        let url = format!(
            "{}/v1/audio/transcriptions",
            self.endpoint.trim_end_matches('/')
        );

        let mut request = ureq::post(&url).timeout(self.timeout).set(
            "Content-Type",
            &format!("multipart/form-data; boundary={}", boundary),
        );

        if let Some(ref key) = self.api_key {
            request = request.set("Authorization", &format!("Bearer {}", key));
        }

        let response = request.send_bytes(&body).map_err(|e| match e {
            ureq::Error::Status(code, resp) => {
                let body = resp.into_string().unwrap_or_default();
                TranscribeError::RemoteError(format!("Server returned {}: {}", code, body))
            }
            ureq::Error::Transport(t) => {
                TranscribeError::NetworkError(format!("Request failed: {}", t))
            }
        })?;

        let json: serde_json::Value = response
            .into_json()
            .map_err(|e| TranscribeError::RemoteError(format!("Failed to parse response: {}", e)))?;

        let text = json
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                TranscribeError::RemoteError(format!("Response missing 'text' field: {}", json))
            })?
            .trim()
            .to_string();

        tracing::info!(
            "Remote transcription completed in {:.2}s ({} chars)",
            start.elapsed().as_secs_f32(),
            text.chars().count()
        );

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> TranscribeConfig {
        TranscribeConfig {
            endpoint: "http://localhost:8080".to_string(),
            model: "whisper-1".to_string(),
            api_key: None,
            prompt: None,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_rejects_bad_endpoint_scheme() {
        let mut config = test_config();
        config.endpoint = "ftp://example.com".to_string();
        assert!(RemoteTranscriber::new(&config, 24000).is_err());

        config.endpoint = "api.openai.com".to_string();
        assert!(RemoteTranscriber::new(&config, 24000).is_err());
    }

    #[test]
    fn test_encode_wav_header() {
        let t = RemoteTranscriber::new(&test_config(), 24000).unwrap();
        let pcm: Vec<u8> = vec![0, 0, 255, 127, 0, 128]; // 3 samples
        let wav = t.encode_wav(&pcm).unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // sample rate field of the fmt chunk
        assert_eq!(
            u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]),
            24000
        );
        // 44-byte header + payload
        assert_eq!(wav.len(), 44 + pcm.len());
    }

    #[test]
    fn test_encode_wav_drops_trailing_odd_byte() {
        let t = RemoteTranscriber::new(&test_config(), 24000).unwrap();
        let wav = t.encode_wav(&[1, 2, 3, 4, 5]).unwrap();
        // 2 complete samples survive
        assert_eq!(wav.len(), 44 + 4);
    }

    #[test]
    fn test_multipart_body_contains_fields() {
        let mut config = test_config();
        config.prompt = Some("keyvox, evdev".to_string());
        let t = RemoteTranscriber::new(&config, 24000).unwrap();

        let (boundary, body) = t.build_multipart_body(b"RIFFxxxx");
        let body_str = String::from_utf8_lossy(&body);

        assert!(body_str.contains(&boundary));
        assert!(body_str.contains("name=\"file\""));
        assert!(body_str.contains("name=\"model\""));
        assert!(body_str.contains("whisper-1"));
        assert!(body_str.contains("name=\"prompt\""));
        assert!(body_str.contains("keyvox, evdev"));
        assert!(body_str.ends_with(&format!("--{}--\r\n", boundary)));
    }

    #[test]
    fn test_transcribe_rejects_empty_segment() {
        let t = RemoteTranscriber::new(&test_config(), 24000).unwrap();
        assert!(matches!(
            t.transcribe(&[]),
            Err(TranscribeError::AudioFormat(_))
        ));
    }
}
