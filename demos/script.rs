//! Example: compiling a kernel script
//!
//! Run with: cargo run --example script

use expr_to_il::{compile, ArgumentBuffer, KernelConfig};

const SAXPY: &str = r#"
threads 128;
arg float a;
uav raw float x 0;
uav raw float y 1;

var uint i = tid_flat;
y[i] = mad(a, x[i], y[i]);
"#;

fn main() {
    println!("=== Script Example ===\n");
    println!("Script:{}", SAXPY);

    let program = match compile(SAXPY, &KernelConfig::default()) {
        Ok(program) => program,
        Err(e) => {
            println!("Error: {}", e);
            return;
        }
    };
    println!("{}", program);

    let mut args = ArgumentBuffer::new(&program);
    let mut mapped = vec![0u8; 16];
    args.set("a", 2.0f32).ok();
    match args.prepare(&mut mapped) {
        Ok(ranges) => println!("Uploaded argument bytes: {:?}", ranges),
        Err(e) => println!("Error: {}", e),
    }
}
