//! Encodes a synthetic red/blue gradient disc into a still `.bin` file and
//! writes it next to the binary's working directory.
//!
//! Run with: `cargo run --example encode-to-bin`

use holofan::codec::{encode_animation, PixelOrder, RasterFrame};

fn gradient_disc(side: u32) -> RasterFrame {
    let mut data = vec![0u8; side as usize * side as usize * 3];
    let centre = f64::from(side) / 2.0;
    for y in 0..side {
        for x in 0..side {
            let dx = f64::from(x) + 0.5 - centre;
            let dy = f64::from(y) + 0.5 - centre;
            let rho = (dx * dx + dy * dy).sqrt() / centre;
            let idx = (y as usize * side as usize + x as usize) * 3;
            let r = ((1.0 - rho.min(1.0)) * 255.0) as u8;
            let b = (rho.min(1.0) * 255.0) as u8;
            data[idx..idx + 3].copy_from_slice(&[r, 0, b]);
        }
    }
    RasterFrame::new(side, PixelOrder::Rgb, data).unwrap()
}

fn main() -> std::io::Result<()> {
    let frame = gradient_disc(256);
    let bin = encode_animation(std::slice::from_ref(&frame)).expect("encoding a single frame always succeeds");
    std::fs::write("gradient.bin", &bin)?;
    println!("wrote {} bytes to gradient.bin", bin.len());
    Ok(())
}
