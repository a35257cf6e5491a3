use tableau_kernel::message::AudioMessage;

/// Playback state of the single song channel.
#[derive(Debug, Clone, PartialEq)]
pub enum SongState {
    Silent,
    Playing { asset: String, volume: f32 },
    /// Fading toward silence over the remaining tick count.
    FadingOut { asset: String, remaining: u64 },
}

/// Player-agnostic interface. All audio backends implement this trait.
///
/// The player drains one tick's message batch; sounds are fire-and-forget,
/// the song channel is stateful and exclusive.
pub trait AudioPlayer {
    /// Process one tick's message batch and advance any in-progress fade.
    fn update(&mut self, messages: Vec<AudioMessage>);
}

/// Logging player standing in for a platform audio backend.
///
/// Tracks the song channel and counts triggered sounds so tests and the CLI
/// can observe audio behavior without a device.
#[derive(Debug, Default)]
pub struct NullAudioPlayer {
    song: Option<SongState>,
    sounds_played: u64,
}

impl NullAudioPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn song(&self) -> &SongState {
        self.song.as_ref().unwrap_or(&SongState::Silent)
    }

    pub fn sounds_played(&self) -> u64 {
        self.sounds_played
    }

    fn advance_fade(&mut self) {
        if let Some(SongState::FadingOut { asset, remaining }) = self.song.clone() {
            if remaining <= 1 {
                tracing::debug!(%asset, "song faded out");
                self.song = Some(SongState::Silent);
            } else {
                self.song = Some(SongState::FadingOut {
                    asset,
                    remaining: remaining - 1,
                });
            }
        }
    }
}

impl AudioPlayer for NullAudioPlayer {
    fn update(&mut self, messages: Vec<AudioMessage>) {
        for message in messages {
            match message {
                AudioMessage::PlaySound { asset, volume } => {
                    tracing::debug!(%asset, volume, "play sound");
                    self.sounds_played += 1;
                }
                AudioMessage::PlaySong { asset, volume } => {
                    tracing::debug!(%asset, volume, "play song");
                    self.song = Some(SongState::Playing { asset, volume });
                }
                AudioMessage::FadeOutSong { ticks } => {
                    if let Some(SongState::Playing { asset, .. }) = self.song.clone() {
                        if ticks == 0 {
                            self.song = Some(SongState::Silent);
                        } else {
                            self.song = Some(SongState::FadingOut {
                                asset,
                                remaining: ticks,
                            });
                        }
                    }
                }
                AudioMessage::StopSong => {
                    self.song = Some(SongState::Silent);
                }
            }
        }
        self.advance_fade();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn song_channel_is_exclusive() {
        let mut player = NullAudioPlayer::new();
        player.update(vec![
            AudioMessage::PlaySong {
                asset: "waves".into(),
                volume: 1.0,
            },
            AudioMessage::PlaySong {
                asset: "gulls".into(),
                volume: 0.5,
            },
        ]);
        assert_eq!(
            *player.song(),
            SongState::Playing {
                asset: "gulls".into(),
                volume: 0.5
            }
        );
    }

    #[test]
    fn fade_reaches_silence_after_requested_ticks() {
        let mut player = NullAudioPlayer::new();
        player.update(vec![AudioMessage::PlaySong {
            asset: "waves".into(),
            volume: 1.0,
        }]);
        player.update(vec![AudioMessage::FadeOutSong { ticks: 3 }]);
        assert!(matches!(player.song(), SongState::FadingOut { remaining: 2, .. }));

        player.update(Vec::new());
        player.update(Vec::new());
        assert_eq!(*player.song(), SongState::Silent);
    }

    #[test]
    fn fade_without_song_is_noop() {
        let mut player = NullAudioPlayer::new();
        player.update(vec![AudioMessage::FadeOutSong { ticks: 3 }]);
        assert_eq!(*player.song(), SongState::Silent);
    }

    #[test]
    fn sounds_are_counted() {
        let mut player = NullAudioPlayer::new();
        player.update(vec![
            AudioMessage::PlaySound {
                asset: "bounce".into(),
                volume: 1.0,
            },
            AudioMessage::PlaySound {
                asset: "bounce".into(),
                volume: 1.0,
            },
        ]);
        assert_eq!(player.sounds_played(), 2);
    }
}
