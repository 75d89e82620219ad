// crates/execution/src/engine_api/methods.rs

pub const ENGINE_FORKCHOICE_UPDATED_V1: &str = "engine_forkchoiceUpdatedV1";
pub const ENGINE_NEW_PAYLOAD_V3: &str = "engine_newPayloadV3";
pub const ENGINE_EXCHANGE_TRANSITION_CONFIGURATION_V1: &str =
    "engine_exchangeTransitionConfigurationV1";

/// Payload building belongs to whoever drives block production; the relay never
/// sends this one.
pub const ENGINE_GET_PAYLOAD_V1: &str = "engine_getPayloadV1";

