//! Configuration validation
//!
//! Rules:
//! - at least one connection
//! - every id within `[MIN_ENDPOINT_ID, MAX_ENDPOINT_ID]`
//! - source paths not empty
//! - workers >= 1
//! - max_payload in `[1, MAX_PAYLOAD]`
//! - wait_timeout_ms in `[1, MAX_WAIT_TIMEOUT_MS]`, drain_window_ms <= `MAX_DRAIN_WINDOW_MS`
//! - buffer capacity holds one maximal frame plus headroom, and stays within
//!   `MAX_BUFFER_CAPACITY`

use contracts::{
    ContractError, RunBlueprint, MAX_BUFFER_CAPACITY, MAX_DRAIN_WINDOW_MS, MAX_ENDPOINT_ID,
    MAX_PAYLOAD, MAX_WAIT_TIMEOUT_MS, MIN_ENDPOINT_ID,
};

/// Validate a RunBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    validate_connections(blueprint)?;
    validate_endpoint_ids(blueprint)?;
    validate_dispatch(blueprint)?;
    validate_buffer(blueprint)?;
    Ok(())
}

fn validate_connections(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    if blueprint.connections.is_empty() {
        return Err(ContractError::config_validation(
            "connections",
            "at least one connection is required",
        ));
    }
    for (idx, connection) in blueprint.connections.iter().enumerate() {
        if connection.source.as_os_str().is_empty() {
            return Err(ContractError::config_validation(
                format!("connections[{idx}].source"),
                "source path cannot be empty",
            ));
        }
    }
    Ok(())
}

/// Port numbers must range from MIN_ENDPOINT_ID to MAX_ENDPOINT_ID
fn validate_endpoint_ids(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    for (idx, connection) in blueprint.connections.iter().enumerate() {
        if !connection.route().in_range() {
            return Err(ContractError::config_validation(
                format!("connections[{idx}]"),
                format!(
                    "ids {} and/or {} out of range [{MIN_ENDPOINT_ID}, {MAX_ENDPOINT_ID}]",
                    connection.source_id, connection.destination_id
                ),
            ));
        }
    }
    Ok(())
}

fn validate_dispatch(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    let dispatch = &blueprint.dispatch;
    if dispatch.workers == 0 {
        return Err(ContractError::config_validation(
            "dispatch.workers",
            "workers must be >= 1",
        ));
    }
    if dispatch.max_payload == 0 {
        return Err(ContractError::config_validation(
            "dispatch.max_payload",
            "max_payload must be >= 1",
        ));
    }
    if dispatch.max_payload > MAX_PAYLOAD {
        return Err(ContractError::config_validation(
            "dispatch.max_payload",
            format!("max_payload ({}) must be <= {MAX_PAYLOAD}", dispatch.max_payload),
        ));
    }
    if dispatch.drain_window_ms > MAX_DRAIN_WINDOW_MS {
        return Err(ContractError::config_validation(
            "dispatch.drain_window_ms",
            format!(
                "drain_window_ms ({}) must be <= {MAX_DRAIN_WINDOW_MS}",
                dispatch.drain_window_ms
            ),
        ));
    }
    Ok(())
}

fn validate_buffer(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    let buffer = &blueprint.buffer;
    if buffer.wait_timeout_ms == 0 {
        return Err(ContractError::config_validation(
            "buffer.wait_timeout_ms",
            "wait_timeout_ms must be >= 1",
        ));
    }
    if buffer.wait_timeout_ms > MAX_WAIT_TIMEOUT_MS {
        return Err(ContractError::config_validation(
            "buffer.wait_timeout_ms",
            format!(
                "wait_timeout_ms ({}) must be <= {MAX_WAIT_TIMEOUT_MS}",
                buffer.wait_timeout_ms
            ),
        ));
    }
    if buffer.capacity > MAX_BUFFER_CAPACITY {
        return Err(ContractError::config_validation(
            "buffer.capacity",
            format!(
                "capacity ({}) must be <= {MAX_BUFFER_CAPACITY}",
                buffer.capacity
            ),
        ));
    }
    let Some(required) = blueprint.min_buffer_capacity() else {
        return Err(ContractError::config_validation(
            "dispatch.max_payload",
            format!(
                "max_payload ({}) overflows the frame size",
                blueprint.dispatch.max_payload
            ),
        ));
    };
    if buffer.capacity < required {
        return Err(ContractError::config_validation(
            "buffer.capacity",
            format!(
                "capacity ({}) cannot hold one frame of max_payload {}: need >= {required}",
                buffer.capacity, blueprint.dispatch.max_payload
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BufferConfig, ConfigVersion, ConnectionConfig, DispatchConfig, SinkConfig};

    fn minimal_blueprint() -> RunBlueprint {
        RunBlueprint {
            version: ConfigVersion::V1,
            buffer: BufferConfig::default(),
            dispatch: DispatchConfig::default(),
            sinks: SinkConfig::default(),
            connections: vec![ConnectionConfig {
                source_id: 1,
                destination_id: 11,
                source: "rndtxt1.txt".into(),
            }],
        }
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_boundary_ids_accepted() {
        let mut bp = minimal_blueprint();
        bp.connections[0].source_id = 0;
        bp.connections[0].destination_id = 128;
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_id_out_of_range() {
        let mut bp = minimal_blueprint();
        bp.connections[0].destination_id = 129;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("out of range"), "got: {err}");
        assert!(err.contains("connections[0]"), "got: {err}");
    }

    #[test]
    fn test_no_connections() {
        let mut bp = minimal_blueprint();
        bp.connections.clear();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("at least one connection"), "got: {err}");
    }

    #[test]
    fn test_empty_source_path() {
        let mut bp = minimal_blueprint();
        bp.connections[0].source = Default::default();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_zero_workers() {
        let mut bp = minimal_blueprint();
        bp.dispatch.workers = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("workers must be >= 1"), "got: {err}");
    }

    #[test]
    fn test_capacity_too_small() {
        let mut bp = minimal_blueprint();
        bp.buffer.capacity = 100;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("need >= 137"), "got: {err}");
    }

    #[test]
    fn test_zero_wait_timeout() {
        let mut bp = minimal_blueprint();
        bp.buffer.wait_timeout_ms = 0;
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_huge_max_payload_is_rejected() {
        let mut bp = minimal_blueprint();
        bp.dispatch.max_payload = usize::MAX;
        let err = validate(&bp).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("dispatch.max_payload"), "got: {err}");
    }

    #[test]
    fn test_max_payload_upper_bound() {
        let mut bp = minimal_blueprint();
        bp.dispatch.max_payload = MAX_PAYLOAD;
        assert!(validate(&bp).is_ok());

        bp.dispatch.max_payload = MAX_PAYLOAD + 1;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("must be <="), "got: {err}");
    }

    #[test]
    fn test_huge_capacity_is_rejected() {
        let mut bp = minimal_blueprint();
        bp.buffer.capacity = usize::MAX;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("buffer.capacity"), "got: {err}");

        bp.buffer.capacity = MAX_BUFFER_CAPACITY;
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_wait_timeout_upper_bound() {
        let mut bp = minimal_blueprint();
        bp.buffer.wait_timeout_ms = MAX_WAIT_TIMEOUT_MS;
        assert!(validate(&bp).is_ok());

        bp.buffer.wait_timeout_ms = u64::MAX;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("buffer.wait_timeout_ms"), "got: {err}");
    }

    #[test]
    fn test_drain_window_upper_bound() {
        let mut bp = minimal_blueprint();
        bp.dispatch.drain_window_ms = u64::MAX;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("dispatch.drain_window_ms"), "got: {err}");
    }
}
