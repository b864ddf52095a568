use flashsim_machine::{RequestKind, Simulator, SimulatorConfig, Stage, TraceRequest};

/// RAW: a read behind a write to the same LBA must not issue to NAND; it
/// waits for the write to reach the cache and is then served as a hit.
#[test]
fn read_after_write_waits_for_the_cache() {
    let mut sim = Simulator::new(SimulatorConfig::default()).unwrap();
    let trace = [TraceRequest::write(5, 0), TraceRequest::read(5, 0)];
    let report = sim.run_until(&trace, Some(100));

    let write = &report.completed[0];
    let read = &report.completed[1];
    assert_eq!(write.kind, RequestKind::Write);
    assert_eq!(read.kind, RequestKind::Read);

    // The read could not start before the write's data landed.
    let write_landed = write.trace.get(Stage::CacheWriteComplete).unwrap();
    let read_start = read.trace.get(Stage::CacheReadStart).unwrap();
    assert!(read_start >= write_landed);
    assert!(!read.trace.contains(Stage::NandReadStart));
    assert_eq!(report.stats.nand_reads, 0);
}

/// WAW: two writes to one LBA reach the cache in submission order; the
/// second transfer starts only after the first one's data landed.
#[test]
fn writes_to_one_lba_serialize_through_the_cache() {
    let mut sim = Simulator::new(SimulatorConfig::default()).unwrap();
    let trace = [TraceRequest::write(3, 0), TraceRequest::write(3, 0)];
    let report = sim.run_until(&trace, Some(100));

    let first = &report.completed[0];
    let second = &report.completed[1];
    let first_landed = first.trace.get(Stage::CacheWriteComplete).unwrap();
    let second_started = second.trace.get(Stage::CacheWriteStart).unwrap();
    assert!(second_started >= first_landed);
}

/// An unrelated read is not blocked by writes to other LBAs.
#[test]
fn hazard_tracking_is_per_lba() {
    let mut sim = Simulator::new(SimulatorConfig::default()).unwrap();
    // Seed lba 9's page so the read has somewhere to go on NAND.
    sim.ftl_mut().preload(
        flashsim_machine::Lpa(4),
        flashsim_core::PhysicalAddress {
            channel: 0,
            die: 0,
            plane: 0,
            block: 0,
            page: 0,
        },
    );
    let trace = [TraceRequest::write(5, 0), TraceRequest::read(9, 0)];
    let report = sim.run_until(&trace, Some(200));

    let read = report
        .completed
        .iter()
        .find(|r| r.kind == RequestKind::Read)
        .unwrap();
    // The read issued immediately at arrival, concurrent with the write.
    assert_eq!(read.trace.get(Stage::NandReadStart), Some(0));
}
