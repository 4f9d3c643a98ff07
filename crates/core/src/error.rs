use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("a response is still streaming; wait for it to finish")]
    Busy,

    #[error("no response is open")]
    NoActiveResponse,

    #[error("message is empty")]
    EmptyMessage,
}
