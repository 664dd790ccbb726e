use bridge::BridgeError;
use passthrough::ForwardError;
use server::ServerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Forward(#[from] ForwardError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("Broker kind '{0}' is not available in this build")]
    UnsupportedBroker(&'static str),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
