pub mod retention;
pub mod spotify;
pub mod steam;
pub mod transcription;
pub mod weather;

pub use retention::RetentionSweeper;
pub use spotify::SpotifyClient;
pub use steam::SteamClient;
pub use transcription::Transcriber;
pub use weather::WeatherClient;
