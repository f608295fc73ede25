#![no_main]

use deltri::Triangulation;
use libfuzzer_sys::fuzz_target;

const SQUARE: [[f32; 2]; 4] = [[0.0, 0.0], [0.0, 10.0], [10.0, 10.0], [10.0, 0.0]];

fuzz_target!(|points: Vec<[f32; 2]>| {
    let mut triangulation = Triangulation::new(SQUARE).unwrap();

    for p in points {
        // keep inside the frame, non-finite points are rejected
        let _ = triangulation.insert_vertex([p[0].rem_euclid(10.0), p[1].rem_euclid(10.0)]);
    }
    assert!(triangulation.is_sound().unwrap());
    assert!((triangulation.area() - 100.0).abs() < 1e-3);

    let _ = triangulation.extract_mesh(true, |p| p[0]);
    triangulation.retract_frame().unwrap();
    assert!(triangulation.is_sound().unwrap());
    let _ = triangulation.extract_mesh(false, |_| 0.0);
});
