use ntt_messages::errors::ScalingError;
use thiserror::Error;

/// Every failure is terminal for the operation that raised it: the runtime
/// performs its full validation ladder before the first state mutation, so a
/// returned error means nothing was committed. Retries are the caller's
/// responsibility.
#[derive(Debug, Error, PartialEq)]
pub enum NttError {
    #[error("Contract is not initialised")]
    Uninitialised,
    #[error("Contract is already initialised")]
    AlreadyInitialised,
    #[error("Contract is paused")]
    Paused,
    #[error("Contract is not paused")]
    NotPaused,
    #[error("Caller is missing the required role")]
    Unauthorized,

    #[error("Cannot set itself as peer chain")]
    PeerCannotBeItself,
    #[error("Invalid peer decimals")]
    InvalidPeerDecimals,
    #[error("Invalid peer contract address")]
    InvalidPeerAddress,
    #[error("Unknown peer chain")]
    UnknownPeerChain,
    #[error("Unknown peer address")]
    UnknownPeerAddress,

    #[error("Unknown bucket")]
    UnknownBucket,
    #[error("Not enough capacity")]
    InsufficientCapacity,
    #[error("Queued transfer is still queued")]
    StillQueued,
    #[error("Unknown outbound queued transfer")]
    UnknownOutboundTransfer,
    #[error("Unknown inbound queued transfer")]
    UnknownInboundTransfer,
    #[error("Canceller is not original sender")]
    OnlyOriginalSenderCanCancel,

    #[error("Incorrect prefix")]
    IncorrectPrefix,
    #[error("Invalid target chain")]
    InvalidTargetChain,
    #[error("Cannot transfer zero amount")]
    ZeroAmount,
    #[error("Invalid recipient address")]
    InvalidRecipientAddress,
    #[error("Transfer amount has dust")]
    DustNotAllowed,
    #[error(transparent)]
    Scaling(#[from] ScalingError),

    #[error("Unknown asset")]
    UnknownAsset,
    #[error("Unknown asset receiver")]
    UnknownAssetReceiver,
    #[error("Incorrect asset amount")]
    IncorrectAssetAmount,
    #[error("Asset sender does not match caller")]
    UnauthorizedAssetSender,

    #[error("Unknown fee payment receiver")]
    UnknownFeePaymentReceiver,
    #[error("Insufficient fee payment amount")]
    InsufficientFeePayment,
    #[error("Incorrect fee payment amount")]
    IncorrectFeePayment,

    #[error("Message handler unknown")]
    MessageHandlerUnknown,
    #[error("Message handler is paused")]
    MessageHandlerPaused,
    #[error("Message handler is not paused")]
    MessageHandlerNotPaused,
    #[error("Message handler address mismatch")]
    HandlerAddressMismatch,
    #[error("Caller must be message source address")]
    MessageSourceMismatch,
    #[error("Message not approved")]
    MessageNotApproved,
    #[error("Message already executed")]
    AlreadyExecuted,

    #[error("Cannot set zero threshold")]
    ZeroThreshold,
    #[error("Threshold would retroactively approve pending messages")]
    ThresholdTooLow,

    #[error("Maximum transceivers exceeded")]
    MaxTransceiversExceeded,
    #[error("Transceiver was already added")]
    TransceiverAlreadyAdded,
    #[error("Unknown transceiver")]
    TransceiverUnknown,
    #[error("Transceiver not configured")]
    TransceiverNotConfigured,
    #[error("Message handler has zero transceivers")]
    NoRegisteredTransceivers,
    #[error("Incorrect order or unknown transceiver in instructions")]
    InvalidInstructions,
    #[error("Attestation already received")]
    DuplicateAttestation,

    #[error("Unknown wormhole peer chain")]
    UnknownWormholePeer,
    #[error("Emitter address mismatch")]
    EmitterAddressMismatch,
    #[error("VAA already seen")]
    VaaAlreadySeen,
}
