use thiserror::Error;

#[derive(Debug, Error)]
pub enum DialogueError {
    #[error("llm http error: {0}")]
    Http(String),

    #[error("llm call timed out")]
    Timeout,

    #[error("unparseable llm output: {0}")]
    Parse(String),

    #[error("empty llm output")]
    Empty,
}
