//! Google Cloud Text-to-Speech REST adapter (MP3 output).

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::speech::{SynthesisError, TtsProvider};

const GOOGLE_TTS_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";
const HTTP_TIMEOUT_SECS: u64 = 60;
const FALLBACK_LANGUAGE: &str = "es-US";

/// Spanish voices known to work well, by alias.
pub const RECOMMENDED_VOICES: &[(&str, &str)] = &[
    ("espanol_espana_femenina", "es-ES-Neural2-A"),
    ("espanol_espana_masculina", "es-ES-Neural2-F"),
    ("espanol_estados_unidos_femenina", "es-US-Neural2-A"),
    ("espanol_estados_unidos_masculina", "es-US-Neural2-B"),
    ("espanol_wavenet_femenina", "es-ES-Wavenet-F"),
    ("espanol_wavenet_masculina", "es-ES-Wavenet-G"),
    ("espanol_estudio_femenina", "es-ES-Studio-C"),
    ("espanol_estudio_masculina", "es-ES-Studio-F"),
    ("espanol_chirp_femenina", "es-ES-Chirp-HD-F"),
    ("espanol_chirp_masculina", "es-ES-Chirp-HD-D"),
];

/// Maps an alias to its voice name; anything else is taken as a voice name.
pub fn resolve_voice(name: &str) -> String {
    RECOMMENDED_VOICES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
        .map(|(_, voice)| voice.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// `es-US-Neural2-B` → `es-US`.
pub fn language_code(voice: &str) -> String {
    let mut segments = voice.split('-');
    match (segments.next(), segments.next()) {
        (Some(lang), Some(region)) if !lang.is_empty() && !region.is_empty() => {
            format!("{lang}-{region}")
        }
        _ => FALLBACK_LANGUAGE.to_string(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: String,
}

#[derive(Clone)]
pub struct GoogleTts {
    client: Client,
    api_key: String,
    voice: String,
    endpoint: String,
}

impl GoogleTts {
    pub fn new(api_key: String, voice: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            voice: resolve_voice(voice),
            endpoint: GOOGLE_TTS_URL.to_string(),
        }
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }
}

#[async_trait]
impl TtsProvider for GoogleTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        let body = json!({
            "input": { "text": text },
            "voice": {
                "languageCode": language_code(&self.voice),
                "name": self.voice,
            },
            "audioConfig": { "audioEncoding": "MP3" },
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SynthesisError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Provider(format!(
                "Google TTS error ({status}): {text}"
            )));
        }

        let payload: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::Provider(e.to_string()))?;

        decode_audio(&payload.audio_content)
    }
}

fn decode_audio(encoded: &str) -> Result<Vec<u8>, SynthesisError> {
    let audio = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| SynthesisError::Provider(format!("invalid audioContent: {e}")))?;

    if audio.is_empty() {
        return Err(SynthesisError::Provider(
            "Google TTS returned no audio".to_string(),
        ));
    }
    Ok(audio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_voice_alias() {
        assert_eq!(resolve_voice("espanol_espana_femenina"), "es-ES-Neural2-A");
        assert_eq!(resolve_voice("ESPANOL_CHIRP_MASCULINA"), "es-ES-Chirp-HD-D");
    }

    #[test]
    fn test_resolve_voice_passes_through_names() {
        assert_eq!(resolve_voice("es-US-Neural2-B"), "es-US-Neural2-B");
    }

    #[test]
    fn test_language_code_from_voice() {
        assert_eq!(language_code("es-US-Neural2-B"), "es-US");
        assert_eq!(language_code("es-ES-Chirp-HD-F"), "es-ES");
        assert_eq!(language_code("bogus"), "es-US");
    }

    #[test]
    fn test_decode_audio() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"ID3fake-mp3");
        assert_eq!(decode_audio(&encoded).unwrap(), b"ID3fake-mp3");
    }

    #[test]
    fn test_decode_rejects_empty_and_invalid() {
        assert!(matches!(decode_audio(""), Err(SynthesisError::Provider(_))));
        assert!(matches!(
            decode_audio("not base64!"),
            Err(SynthesisError::Provider(_))
        ));
    }

    #[test]
    fn test_new_resolves_configured_alias() {
        let tts = GoogleTts::new("key".to_string(), "espanol_estados_unidos_femenina");
        assert_eq!(tts.voice(), "es-US-Neural2-A");
    }
}
