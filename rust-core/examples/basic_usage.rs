//! Basic usage example: feed a synthetic walk, read back position and heading
use pdr_sensing::export::SessionLogWriter;
use pdr_sensing::{PdrConfig, PdrEngine, SensorSample};

fn main() -> pdr_sensing::Result<()> {
    println!("=== PDR Sensing Engine: Basic Example ===\n");

    let config = PdrConfig::default();
    let bias = config.calibration.accel_bias;
    let gyro_bias = config.calibration.gyro_bias;
    let mut engine = PdrEngine::new(config)?;
    engine.start();

    let mut log = SessionLogWriter::new(std::io::stdout(), None)?;

    // 100 Hz for 8 seconds: a footfall every 0.6 s, a left turn at t = 4 s
    for tick in 0..800u64 {
        let t = tick * 10_000_000;
        let footfall = tick >= 50 && (tick - 50) % 60 < 15;
        let z = if footfall { 13.81 } else { 9.81 };
        let yaw_rate = if (400..500).contains(&tick) { -std::f64::consts::FRAC_PI_2 } else { 0.0 };

        if let Some(step) = engine.ingest_acceleration(SensorSample::new(
            t,
            [bias[0], bias[1], bias[2] + z],
        )) {
            eprintln!("step {} (amplitude {:.2} m/s²)", step.index, step.amplitude());
        }
        engine.ingest_angular_rate(SensorSample::new(
            t,
            [gyro_bias[0], gyro_bias[1], gyro_bias[2] + yaw_rate],
        ));
        log.record(&engine.snapshot())?;
    }
    log.flush()?;
    engine.stop();

    let p = engine.position();
    println!("\n=== Summary ===");
    println!("Steps:          {}", engine.step_count());
    println!("Distance:       {:.2} m", engine.total_distance());
    println!("Mean step:      {:.2} m", engine.step_length());
    println!("Heading:        {:.1}°", engine.heading_degrees());
    println!("Position (X,Y): ({:.2}, {:.2})", p.x, p.y);

    Ok(())
}
