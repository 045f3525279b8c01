use rasterpress::lossy::dct::{BLOCK_DIM, fdct_8x8, fdct_8x8_reference, idct_8x8};
use std::time::Instant;

fn main() {
    println!("Benchmarking forward DCT implementations...");

    // Level-shifted gradient with a little texture.
    let mut input = [0.0f32; BLOCK_DIM];
    for (i, sample) in input.iter_mut().enumerate() {
        let (x, y) = ((i % 8) as f32, (i / 8) as f32);
        *sample = x * 12.0 + y * 5.0 - 100.0 + if (x + y) as usize % 2 == 0 { 7.0 } else { -7.0 };
    }

    let iterations = 200_000;

    let mut output_reference = [0.0f32; BLOCK_DIM];
    let start = Instant::now();
    for _ in 0..iterations {
        fdct_8x8_reference(std::hint::black_box(&input), &mut output_reference);
        std::hint::black_box(output_reference);
    }
    let duration_reference = start.elapsed();
    println!("Reference FDCT: {:?} for {} iterations", duration_reference, iterations);

    let mut output_separable = [0.0f32; BLOCK_DIM];
    let start = Instant::now();
    for _ in 0..iterations {
        fdct_8x8(std::hint::black_box(&input), &mut output_separable);
        std::hint::black_box(output_separable);
    }
    let duration_separable = start.elapsed();
    println!("Separable FDCT: {:?} for {} iterations", duration_separable, iterations);

    let speedup = duration_reference.as_secs_f64() / duration_separable.as_secs_f64();
    println!("Speedup: {:.2}x", speedup);

    let max_diff = output_reference
        .iter()
        .zip(&output_separable)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);
    println!("Max difference between reference and separable: {}", max_diff);

    let mut restored = [0.0f32; BLOCK_DIM];
    idct_8x8(&output_separable, &mut restored);
    let roundtrip = input
        .iter()
        .zip(&restored)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);
    println!("Max roundtrip error: {}", roundtrip);

    if max_diff < 0.01 && roundtrip < 0.01 {
        println!("Accuracy: PASSED (Tolerance < 0.01)");
    } else {
        println!("Accuracy: FAILED (Tolerance > 0.01)");
    }
}
