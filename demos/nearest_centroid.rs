//! Example: nearest-centroid labelling built with the Rust API
//!
//! Every thread reads one point, finds the closer of two centroids passed
//! as kernel arguments, writes the label and counts it in local memory.
//!
//! Run with: cargo run --example nearest_centroid

use expr_to_il::*;

fn build(threads: u32) -> CompileResult<IlProgram> {
    let mut k = Kernel::begin(KernelConfig::new(threads));
    let c0 = k.arg::<Float4>("c0")?;
    let c1 = k.arg::<Float4>("c1")?;
    let points = k.input2d::<Float4>(0)?;
    let labels = k.uav_raw::<Uint>(0, CacheMode::Auto)?;
    let counts = k.lds::<Uint>(0, 2)?;

    let p = k.var_init(points.sample(cast::<Float2, _>(abs_thread_id().get().xy())))?;
    let d0 = k.var_init(p - c0)?;
    let d1 = k.var_init(p - c1)?;
    let e0 = k.var_init(d0.x() * d0.x() + d0.y() * d0.y())?;
    let e1 = k.var_init(d1.x() * d1.x() + d1.y() * d1.y())?;

    let label = k.var_init(0u32)?;
    k.if_then(e1.cmp_lt(e0), |k| k.assign(label, 1u32))?;
    labels.store(&mut k, abs_thread_id_flat(), label)?;
    counts.atomic_add(&mut k, label, 1u32)?;
    k.barrier();
    k.end()
}

fn main() {
    println!("=== Nearest Centroid Example ===\n");

    for threads in [64, 256] {
        match build(threads) {
            Ok(program) => {
                println!("{}", program.summary());
                println!("{}", program);
            }
            Err(e) => println!("Error: {}", e),
        }
    }
}
