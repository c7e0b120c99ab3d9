/// Procedural sound cues for simulation events, played through rodio.
///
/// Every cue is synthesized into an in-memory WAV once at start-up and
/// replayed fire-and-forget. Without the "sound" feature `SoundEngine`
/// is an empty stub with the same API.

use duskrooms::sim::event::GameEvent;

/// One cue per family of events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sfx {
    Pickup,
    Drop,
    Fuse,
    Blast,
    Hurt,
    Click,
    Unlock,
    DoorOpen,
    Spring,
    Push,
    Warp,
    Riddle,
    Correct,
    Wrong,
    Win,
    Lose,
}

impl Sfx {
    pub const ALL: [Sfx; 16] = [
        Sfx::Pickup, Sfx::Drop, Sfx::Fuse, Sfx::Blast, Sfx::Hurt, Sfx::Click,
        Sfx::Unlock, Sfx::DoorOpen, Sfx::Spring, Sfx::Push, Sfx::Warp,
        Sfx::Riddle, Sfx::Correct, Sfx::Wrong, Sfx::Win, Sfx::Lose,
    ];

    /// Cue for an event, if it has one. Room changes are silent.
    pub fn for_event(ev: &GameEvent) -> Option<Sfx> {
        Some(match ev {
            GameEvent::ItemPicked { .. } | GameEvent::KeyInserted { .. } => Sfx::Pickup,
            GameEvent::ItemDropped { .. } => Sfx::Drop,
            GameEvent::BombPlaced { .. } => Sfx::Fuse,
            GameEvent::BombExploded { .. } => Sfx::Blast,
            GameEvent::LifeLost { .. } => Sfx::Hurt,
            GameEvent::SwitchToggled { .. } => Sfx::Click,
            GameEvent::DoorUnlocked { .. } => Sfx::Unlock,
            GameEvent::DoorOpened { .. } => Sfx::DoorOpen,
            GameEvent::SpringReleased { .. } | GameEvent::BoostTransferred { .. } => Sfx::Spring,
            GameEvent::ObstaclePushed { .. } => Sfx::Push,
            GameEvent::Teleported { .. } => Sfx::Warp,
            GameEvent::RiddleEncountered { .. } => Sfx::Riddle,
            GameEvent::RiddleAnswered { correct: true, .. } => Sfx::Correct,
            GameEvent::RiddleAnswered { correct: false, .. } => Sfx::Wrong,
            GameEvent::GameEnd { won: true, .. } => Sfx::Win,
            GameEvent::GameEnd { won: false, .. } => Sfx::Lose,
            GameEvent::ScreenTransition { .. } => return None,
        })
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::collections::HashMap;
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use tracing::debug;

    use super::Sfx;

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        buffers: HashMap<Sfx, Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(s) => s,
                Err(e) => {
                    debug!("no audio output: {e}");
                    return None;
                }
            };
            let buffers = Sfx::ALL
                .iter()
                .map(|&s| (s, Arc::new(make_wav(&synth(s)))))
                .collect();
            Some(SoundEngine { _stream: stream, handle, buffers })
        }

        pub fn play(&self, sfx: Sfx) {
            let Some(buf) = self.buffers.get(&sfx) else { return };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                if let Ok(src) = rodio::Decoder::new(Cursor::new(buf.as_ref().clone())) {
                    sink.append(src);
                    sink.detach();
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Synthesis
    // ════════════════════════════════════════════════════════════

    fn synth(sfx: Sfx) -> Vec<f32> {
        match sfx {
            Sfx::Pickup => notes(&[(1047.0, 0.04), (1568.0, 0.06)], 0.25),
            Sfx::Drop => sweep(500.0, 250.0, 0.08, 0.2),
            Sfx::Fuse => noise(0.15, 0.12, 0.0),
            Sfx::Blast => noise(0.45, 0.45, 90.0),
            Sfx::Hurt => notes(&[(392.0, 0.1), (330.0, 0.1), (262.0, 0.18)], 0.3),
            Sfx::Click => notes(&[(1800.0, 0.015)], 0.2),
            Sfx::Unlock => notes(&[(660.0, 0.05), (880.0, 0.08)], 0.25),
            Sfx::DoorOpen => sweep(220.0, 660.0, 0.3, 0.25),
            Sfx::Spring => sweep(300.0, 1400.0, 0.18, 0.25),
            Sfx::Push => noise(0.1, 0.2, 120.0),
            Sfx::Warp => sweep(1400.0, 200.0, 0.35, 0.2),
            Sfx::Riddle => notes(&[(523.0, 0.1), (622.0, 0.1), (523.0, 0.15)], 0.2),
            Sfx::Correct => notes(&[(784.0, 0.08), (1047.0, 0.16)], 0.3),
            Sfx::Wrong => notes(&[(196.0, 0.12), (185.0, 0.2)], 0.3),
            Sfx::Win => notes(&[(523.0, 0.1), (659.0, 0.1), (784.0, 0.1), (1047.0, 0.35)], 0.3),
            Sfx::Lose => notes(&[(440.0, 0.15), (370.0, 0.15), (311.0, 0.15), (261.0, 0.4)], 0.3),
        }
    }

    /// Note sequence with a fundamental plus a soft octave, each note fading out.
    fn notes(seq: &[(f32, f32)], volume: f32) -> Vec<f32> {
        let mut out = Vec::new();
        for &(freq, dur) in seq {
            let n = (SAMPLE_RATE as f32 * dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.6);
                let wave = (t * freq * TAU).sin() * 0.75 + (t * freq * 2.0 * TAU).sin() * 0.25;
                out.push(wave * env * volume);
            }
        }
        out
    }

    /// Linear pitch glide.
    fn sweep(from: f32, to: f32, dur: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * dur) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let r = i as f32 / n as f32;
                phase += (from + (to - from) * r) * TAU / SAMPLE_RATE as f32;
                phase.sin() * (1.0 - r) * volume
            })
            .collect()
    }

    /// LCG noise, optionally mixed with a low rumble.
    fn noise(dur: f32, volume: f32, rumble_hz: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * dur) as usize;
        let mut rng: u32 = 0x2545_f491;
        (0..n)
            .map(|i| {
                rng = rng.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                let white = (rng >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0;
                let t = i as f32 / SAMPLE_RATE as f32;
                let low = if rumble_hz > 0.0 { (t * rumble_hz * TAU).sin() } else { 0.0 };
                let env = (1.0 - i as f32 / n as f32).powf(1.5);
                (white * 0.6 + low * 0.4) * env * volume
            })
            .collect()
    }

    /// 16-bit mono PCM WAV container.
    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let data_size = samples.len() as u32 * 2;
        let mut buf = Vec::with_capacity(44 + data_size as usize);
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVEfmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
        buf.extend_from_slice(&2u16.to_le_bytes());
        buf.extend_from_slice(&16u16.to_le_bytes());
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            buf.extend_from_slice(&((s.clamp(-1.0, 1.0) * 32767.0) as i16).to_le_bytes());
        }
        buf
    }

}

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _sfx: Sfx) {}
}

impl SoundEngine {
    /// Play the cue of every event in a tick, once per distinct cue.
    pub fn play_events(&self, events: &[GameEvent]) {
        let mut seen = Vec::new();
        for sfx in events.iter().filter_map(Sfx::for_event) {
            if !seen.contains(&sfx) {
                seen.push(sfx);
                self.play(sfx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn riddle_answers_pick_distinct_cues() {
        let ok = GameEvent::RiddleAnswered { player: 0, question: "q".into(), answer: "a".into(), correct: true };
        let bad = GameEvent::RiddleAnswered { player: 0, question: "q".into(), answer: "b".into(), correct: false };
        assert_eq!(Sfx::for_event(&ok), Some(Sfx::Correct));
        assert_eq!(Sfx::for_event(&bad), Some(Sfx::Wrong));
        assert_eq!(Sfx::for_event(&GameEvent::ScreenTransition { player: 0, room: 1 }), None);
    }
}
