//! # Integration Tests
//!
//! End-to-end tests across the library crates.
//!
//! Covers:
//! - Config snapshot checks
//! - Producers -> ring buffer -> dispatcher pool with memory sinks
//! - Daemon-style runs over files, checked byte for byte

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_example_config_loads() {
        let blueprint = config_loader::ConfigLoader::load_from_str(
            r#"
            [buffer]
            capacity = 4096

            [[connections]]
            source_id = 1
            destination_id = 11
            source = "input1.txt"
            "#,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();

        assert_eq!(blueprint.buffer.capacity, 4096);
        assert_eq!(blueprint.destinations(), vec![11]);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    use contracts::{ConnectionConfig, EndpointId, Route, RunBlueprint, SinkType};
    use dispatcher::{
        compare_files, DispatcherConfig, DispatcherPool, DispatchSnapshot, MemorySink,
        RejectReason, SinkTable,
    };
    use ingestion::{IngestionPipeline, MemorySource, Producer, ProducerConfig, RunningProducers};
    use ring_buffer::RingBuffer;

    const TOKEN_LEN: usize = 8;

    /// `s01n0042`: source id and index, never containing the blocked marker
    fn token(source_id: EndpointId, index: usize) -> String {
        format!("s{source_id:02}n{index:04}")
    }

    fn quiet_producer(max_payload: usize) -> ProducerConfig {
        ProducerConfig {
            max_payload,
            pacing: false,
        }
    }

    /// Wait until producers are done and the ring is drained, then stop and join
    fn drain_and_join(
        producers: RunningProducers,
        ring: &RingBuffer,
        running: &AtomicBool,
        workers: dispatcher::RunningDispatchers,
    ) {
        let deadline = Instant::now() + Duration::from_secs(20);
        while !(producers.all_finished() && ring.is_empty()) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        running.store(false, Ordering::SeqCst);

        for report in producers.join_all() {
            let report = report.unwrap();
            assert!(!report.cancelled, "producer {:?} cancelled", report.route);
        }
        for report in workers.join_all() {
            report.unwrap();
        }
    }

    /// 3 producers x 100 frames through 4 dispatchers into memory sinks
    #[test]
    fn test_e2e_memory_pipeline() {
        let ring = Arc::new(RingBuffer::new(256, Duration::from_millis(2)).unwrap());
        let routes = [Route::new(1, 11), Route::new(2, 12), Route::new(3, 13)];
        let rejected_route = Route::new(20, 22);

        let mut ingestion = IngestionPipeline::new();
        for route in routes.iter().chain([&rejected_route]) {
            let data: String = (0..100).map(|i| token(route.source_id, i)).collect();
            let source = MemorySource::new(format!("input{}", route.source_id), data);
            ingestion.register(Producer::new(
                *route,
                Box::new(source),
                quiet_producer(TOKEN_LEN),
            ));
        }
        let ingestion_metrics = ingestion.metrics();

        let mut table = SinkTable::new();
        let mut sinks = HashMap::new();
        for destination in [11, 12, 13, 22] {
            let sink = MemorySink::new(destination.to_string());
            table.insert(destination, sink.clone());
            sinks.insert(destination, sink);
        }

        let pool = DispatcherPool::new(
            DispatcherConfig {
                workers: 4,
                read_buffer_len: 16,
                pacing: false,
            },
            ring.clone(),
            Arc::new(table),
        );
        let running = Arc::new(AtomicBool::new(true));
        let workers = pool.start(running.clone()).unwrap();
        let producers = ingestion.start_all(ring.clone(), running.clone()).unwrap();

        drain_and_join(producers, &ring, &running, workers);

        let written = ingestion_metrics.snapshot().frames_written;
        let snap: DispatchSnapshot = pool.metrics().snapshot();
        assert_eq!(written, 400);
        assert_eq!(snap.frames_read, 400);
        assert_eq!(snap.accepted + snap.rejected_total(), 400);
        assert_eq!(snap.accepted, 300);
        assert_eq!(snap.rejected_for(RejectReason::SentinelSum), 100);
        assert!(sinks[&22].is_empty());

        // every accepted token exactly once, in its own destination
        for route in routes {
            let contents = sinks[&route.destination_id].contents();
            assert_eq!(contents.len(), 100 * TOKEN_LEN);

            let mut seen: Vec<String> = contents
                .chunks(TOKEN_LEN)
                .map(|chunk| String::from_utf8(chunk.to_vec()).unwrap())
                .collect();
            seen.sort();
            let expected: Vec<String> = (0..100).map(|i| token(route.source_id, i)).collect();
            assert_eq!(seen, expected);
        }
    }

    fn daemon_blueprint(dir: &Path, inputs: &[(EndpointId, EndpointId, &[u8])]) -> RunBlueprint {
        let mut blueprint = RunBlueprint {
            connections: inputs
                .iter()
                .map(|(from, to, data)| {
                    let path = dir.join(format!("input{from}.txt"));
                    fs::write(&path, data).unwrap();
                    ConnectionConfig {
                        source_id: *from,
                        destination_id: *to,
                        source: path,
                    }
                })
                .collect(),
            ..Default::default()
        };
        blueprint.sinks.kind = SinkType::File;
        blueprint.sinks.output_dir = dir.join("out");
        // one worker, so each destination file keeps source order
        blueprint.dispatch.workers = 1;
        config_loader::ConfigLoader::validate(&blueprint).unwrap();
        blueprint
    }

    fn run_daemon(blueprint: &RunBlueprint) -> DispatchSnapshot {
        let ingestion = IngestionPipeline::from_blueprint(blueprint).unwrap();
        let ring = Arc::new(
            RingBuffer::new(blueprint.buffer.capacity, blueprint.buffer.wait_timeout()).unwrap(),
        );
        let sinks = Arc::new(SinkTable::from_blueprint(blueprint).unwrap());
        let pool = DispatcherPool::new(
            DispatcherConfig::from_blueprint(blueprint),
            ring.clone(),
            sinks.clone(),
        );

        let running = Arc::new(AtomicBool::new(true));
        let workers = pool.start(running.clone()).unwrap();
        let producers = ingestion.start_all(ring.clone(), running.clone()).unwrap();
        drain_and_join(producers, &ring, &running, workers);

        sinks.close_all().unwrap();
        pool.metrics().snapshot()
    }

    /// Each destination file matches its single source, byte for byte
    #[test]
    fn test_e2e_file_outputs_match_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let one: Vec<u8> = (0..3000u32).map(|i| b'0' + (i % 10) as u8).collect();
        let two = b"The quick brown fox jumps over the lazy dog\n".repeat(40);
        let three = vec![b'#'; 777];
        let blueprint = daemon_blueprint(
            dir.path(),
            &[(1, 11, &one), (2, 12, &two), (3, 13, &three)],
        );

        let snap = run_daemon(&blueprint);
        assert_eq!(snap.rejected_total(), 0);
        assert_eq!(snap.bytes_by_destination[&11], one.len() as u64);

        for (from, to) in [(1, 11), (2, 12), (3, 13)] {
            let input = dir.path().join(format!("input{from}.txt"));
            let output = dir.path().join(format!("out/{to}.txt"));
            let comparison = compare_files(&input, &output).unwrap();
            assert!(comparison.is_identical(), "{from} -> {to}: {comparison:?}");
        }
    }

    /// A frame carrying the marker letters in order, gaps allowed, is dropped
    #[test]
    fn test_e2e_loose_marker_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let blueprint = daemon_blueprint(
            dir.path(),
            &[(1, 11, b"m_a_l_i_c_i_o_u_s"), (2, 12, b"harmless")],
        );

        let snap = run_daemon(&blueprint);
        assert_eq!(snap.rejected_for(RejectReason::BlockedMarker), 1);
        assert_eq!(snap.accepted, 1);
        assert!(fs::read(dir.path().join("out/11.txt")).unwrap().is_empty());
        assert_eq!(fs::read(dir.path().join("out/12.txt")).unwrap(), b"harmless");
    }
}
