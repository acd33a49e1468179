pub mod mock_api_server;
pub mod mock_gemini_server;

pub use mock_api_server::{MockTaskServer, RecordedRequest};
pub use mock_gemini_server::MockGeminiServer;
