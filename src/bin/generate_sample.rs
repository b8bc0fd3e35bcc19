use equipment_pulse::rng::{RandomSource, SimpleRng};

/// Box-Muller transform for normal distribution
fn gauss(rng: &mut SimpleRng, mean: f64, std_dev: f64) -> f64 {
    let u1 = rng.next_f64().max(1e-15);
    let u2 = rng.next_f64();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

fn main() {
    let mut rng = SimpleRng::new(42);

    // (type, count, flowrate mean, pressure mean, temperature mean)
    let profiles: [(&str, usize, f64, f64, f64); 6] = [
        ("Pump", 4, 120.0, 5.2, 110.0),
        ("Compressor", 2, 95.0, 8.4, 95.0),
        ("Valve", 3, 60.0, 4.1, 105.0),
        ("HeatExchanger", 3, 150.0, 6.2, 130.0),
        ("Reactor", 2, 140.0, 7.5, 140.0),
        ("Condenser", 1, 190.0, 6.8, 136.0),
    ];

    let output_path = "sample_equipment.csv";
    let mut writer = csv::Writer::from_path(output_path).expect("Failed to create output file");
    writer
        .write_record(["Equipment Name", "Type", "Flowrate", "Pressure", "Temperature"])
        .expect("Failed to write header");

    let mut rows = 0;
    for (kind, count, flow, pressure, temp) in profiles {
        for n in 1..=count {
            let name = format!("{kind}-{n}");
            writer
                .write_record([
                    name,
                    kind.to_string(),
                    format!("{:.1}", gauss(&mut rng, flow, flow * 0.05)),
                    format!("{:.2}", gauss(&mut rng, pressure, 0.3)),
                    format!("{:.1}", gauss(&mut rng, temp, 3.0)),
                ])
                .expect("Failed to write row");
            rows += 1;
        }
    }
    writer.flush().expect("Failed to flush output");

    println!("Wrote {rows} equipment rows to {output_path}");
}
