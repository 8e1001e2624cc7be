pub mod groq;
pub mod progres;

pub use groq::GroqClient;
pub use progres::ProgresClient;
