//! Block-level hot-path benchmarks: the LUT cosine lookup and the
//! per-sample ADSR/SVF loops, the functions `process()` calls once per
//! sample for every voice in a patch.
//!
//! Run: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ggm::core::block::AudioBuf;
use ggm::dsp::envelope::Adsr;
use ggm::dsp::filter::svf::{Svf, SvfType};
use ggm_core::lut::cos_lookup;
use ggm_core::BLOCK;

fn bench_cos_lookup(c: &mut Criterion) {
    c.bench_function("cos_lookup", |b| {
        let mut x: u32 = 0;
        b.iter(|| {
            x = x.wrapping_add(104_053);
            black_box(cos_lookup(black_box(x)))
        });
    });
}

fn bench_adsr_block(c: &mut Criterion) {
    c.bench_function("adsr_process_block", |b| {
        let mut env = Adsr::new(48_000.0);
        env.set_sustain(0.5);
        env.gate(1.0);
        let mut buf: AudioBuf = [0.0; BLOCK];
        b.iter(|| black_box(env.process(&mut buf)));
    });
}

fn bench_svf_block(c: &mut Criterion) {
    c.bench_function("svf_trapezoidal_process_block", |b| {
        let mut filt = Svf::new(SvfType::Trapezoidal, 48_000.0);
        filt.set_cutoff(1_200.0);
        filt.set_resonance(0.3);
        let input: AudioBuf = [0.2; BLOCK];
        let mut out: AudioBuf = [0.0; BLOCK];
        b.iter(|| black_box(filt.process(black_box(&input), &mut out)));
    });
}

criterion_group!(benches, bench_cos_lookup, bench_adsr_block, bench_svf_block);
criterion_main!(benches);
