//! Sound cue descriptors.
//!
//! Synthesis is left to the host. Each [`Cue`] maps to a short tone
//! description that any audio backend can render.

use std::time::Duration;

use crate::inference::Cue;

/// Oscillator shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
}

/// How the pitch moves over the tone.
#[derive(Debug, Clone, PartialEq)]
pub enum Pitch {
    /// Exponential ramp from `from` to `to` over `over`.
    Ramp { from: f32, to: f32, over: Duration },
    /// Discrete steps, each starting at the given offset.
    Steps(Vec<(Duration, f32)>),
}

/// A single decaying tone.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneSpec {
    pub waveform: Waveform,
    pub pitch: Pitch,
    pub gain: f32,
    /// Time for the gain to decay to silence; also the tone length.
    pub duration: Duration,
}

impl Cue {
    pub fn tone(self) -> ToneSpec {
        let ms = Duration::from_millis;
        match self {
            Self::PaddleHit => ToneSpec {
                waveform: Waveform::Sine,
                pitch: Pitch::Ramp {
                    from: 220.0,
                    to: 110.0,
                    over: ms(100),
                },
                gain: 0.5,
                duration: ms(200),
            },
            Self::Score => ToneSpec {
                waveform: Waveform::Square,
                pitch: Pitch::Ramp {
                    from: 440.0,
                    to: 880.0,
                    over: ms(200),
                },
                gain: 0.5,
                duration: ms(300),
            },
            Self::GameStart => ToneSpec {
                waveform: Waveform::Sine,
                pitch: Pitch::Steps(vec![
                    (ms(0), 330.0),
                    (ms(200), 440.0),
                    (ms(400), 554.0),
                ]),
                gain: 0.5,
                duration: ms(600),
            },
            Self::GameOver => ToneSpec {
                waveform: Waveform::Sawtooth,
                pitch: Pitch::Ramp {
                    from: 440.0,
                    to: 110.0,
                    over: ms(500),
                },
                gain: 0.5,
                duration: ms(500),
            },
        }
    }
}

/// Host audio backend.
pub trait CueSink: Send {
    fn play(&mut self, cue: Cue);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn game_start_is_a_rising_arpeggio() {
        let Pitch::Steps(steps) = Cue::GameStart.tone().pitch else {
            panic!("expected steps");
        };
        let freqs: Vec<f32> = steps.iter().map(|(_, f)| *f).collect();
        assert_eq!(freqs, vec![330.0, 440.0, 554.0]);
    }

    #[test]
    fn ramps_finish_within_the_tone() {
        for cue in [Cue::PaddleHit, Cue::Score, Cue::GameOver] {
            let tone = cue.tone();
            let Pitch::Ramp { over, .. } = tone.pitch else {
                panic!("expected ramp for {cue:?}");
            };
            assert!(over <= tone.duration);
        }
    }
}
