//! Integration tests for subsnake-core DSP primitives.
//!
//! Chains the primitives the way a voice does and checks signal-level
//! behaviour: filter attenuation of a band-limited saw, envelope timing
//! against the one-pole law, and modulators driving other processors.

use subsnake_core::{
    Adsr, AdsrModulation, AntiAlias, EnvelopeStage, FilterModulation, FilterType, Lfo,
    LfoModulation, LfoShape, ModEnv, ModEnvMode, ModEnvModulation, ModInput, OscModulation,
    Oscillator, StateVariableFilter, Waveform,
};

const SAMPLE_RATE: f32 = 44100.0;
const BLOCK: usize = 512;

/// Measure RMS amplitude of the left channel.
fn rms(block: &[[f32; 2]]) -> f32 {
    let sum_sq: f32 = block.iter().map(|f| f[0] * f[0]).sum();
    (sum_sq / block.len() as f32).sqrt()
}

/// Render `blocks` blocks of oscillator output through a filter.
fn filtered_saw(cutoff: f32, blocks: usize) -> Vec<[f32; 2]> {
    let mut osc = Oscillator::new(SAMPLE_RATE);
    osc.set_waveform(Waveform::Saw);
    osc.set_frequency(110.0);
    osc.set_amplitude(0.3);
    let mut svf = StateVariableFilter::new(SAMPLE_RATE);
    svf.set_cutoff(cutoff);
    svf.set_resonance(1.4);

    let mut out = Vec::with_capacity(blocks * BLOCK);
    let mut block = [[0.0f32; 2]; BLOCK];
    for _ in 0..blocks {
        osc.render(&mut block, &OscModulation::default());
        svf.render(&mut block, &[], &FilterModulation::default());
        out.extend_from_slice(&block);
    }
    out
}

// ============================================================================
// 1. Oscillator into filter
// ============================================================================

#[test]
fn test_lower_cutoff_darkens_saw() {
    let bright = filtered_saw(6000.0, 40);
    let dark = filtered_saw(40.0, 40);
    let bright_rms = rms(&bright[BLOCK * 20..]);
    let dark_rms = rms(&dark[BLOCK * 20..]);
    assert!(
        dark_rms < bright_rms * 0.8,
        "dark {} should be well below bright {}",
        dark_rms,
        bright_rms
    );
}

#[test]
fn test_blit_and_polyblep_saw_agree_in_level() {
    let mut levels = Vec::new();
    for aa in [AntiAlias::Blit, AntiAlias::PolyBlep] {
        let mut osc = Oscillator::new(SAMPLE_RATE);
        osc.set_waveform(Waveform::Saw);
        osc.set_anti_alias(aa);
        osc.set_frequency(220.0);
        let mut block = vec![[0.0f32; 2]; 44100];
        osc.render(&mut block, &OscModulation::default());
        levels.push(rms(&block[22050..]));
    }
    // A unit saw has RMS 1/sqrt(3)
    for level in &levels {
        assert!((level - 0.577).abs() < 0.08, "saw rms {}", level);
    }
}

// ============================================================================
// 2. Envelope timing
// ============================================================================

#[test]
fn test_attack_then_decay_curve() {
    let attack = 0.05;
    let decay = 0.1;
    let sustain = 0.4;
    let mut env = Adsr::new(SAMPLE_RATE);
    env.set_attack(attack);
    env.set_decay(decay);
    env.set_sustain(sustain);
    env.gate_on(0);

    let mut levels = Vec::new();
    let mut block = [0.0f32; BLOCK];
    for _ in 0..120 {
        env.render(&mut block, &AdsrModulation::default());
        levels.extend_from_slice(&block);
    }

    let tau = 2205; // 50 ms at 44.1 kHz
    assert!((levels[tau - 1] - 0.632).abs() < 0.002, "one time constant: {}", levels[tau - 1]);

    // First sample of decay follows the peak at 1.0
    let peak = levels
        .iter()
        .position(|&l| l == 1.0)
        .unwrap_or(levels.len());
    assert!(peak < tau * 7 + 2, "attack completed at {}", peak);

    let decay_tau = decay * SAMPLE_RATE;
    for k in [100usize, 1000, 3000] {
        let expected = sustain + (1.0 - sustain) * (-(k as f32) / decay_tau).exp();
        let got = levels[peak + k];
        assert!((got - expected).abs() < 0.01, "decay at +{}: {} vs {}", k, got, expected);
    }
    assert_eq!(env.stage(), EnvelopeStage::Sustain);
}

#[test]
fn test_amp_envelope_gates_oscillator() {
    let mut osc = Oscillator::new(SAMPLE_RATE);
    let mut env = Adsr::new(SAMPLE_RATE);
    env.gate_on(256);
    let mut block = [[0.0f32; 2]; BLOCK];
    osc.render(&mut block, &OscModulation::default());
    env.apply(&mut block, &AdsrModulation::default());
    assert!(block[..256].iter().all(|f| f[0] == 0.0));
    assert!(block[256..].iter().any(|f| f[0] != 0.0));
}

// ============================================================================
// 3. Modulators driving processors
// ============================================================================

#[test]
fn test_lfo_sweeps_filter_cutoff() {
    let mut lfo = Lfo::new(SAMPLE_RATE, 5.0);
    lfo.set_shape(LfoShape::Square);
    let mut osc = Oscillator::new(SAMPLE_RATE);
    osc.set_waveform(Waveform::Saw);
    osc.set_frequency(220.0);
    osc.set_amplitude(0.3);
    let mut svf = StateVariableFilter::new(SAMPLE_RATE);
    svf.set_cutoff(1000.0);

    let mut control = [0.0f32; BLOCK];
    let mut block = [[0.0f32; 2]; BLOCK];
    let mut min_rms = f32::MAX;
    let mut max_rms = 0.0f32;
    for i in 0..80 {
        lfo.render(&mut control, &LfoModulation::default());
        osc.render(&mut block, &OscModulation::default());
        let mods = FilterModulation {
            cutoff: ModInput::new(&control, 0.9),
            ..FilterModulation::default()
        };
        svf.render(&mut block, &[], &mods);
        if i > 10 {
            let r = rms(&block);
            min_rms = min_rms.min(r);
            max_rms = max_rms.max(r);
        }
    }
    assert!(max_rms > min_rms * 1.3, "sweep range {}..{}", min_rms, max_rms);
}

#[test]
fn test_mod_env_bends_pitch() {
    let mut menv = ModEnv::new(SAMPLE_RATE);
    menv.set_mode(ModEnvMode::Hold);
    menv.set_attack(0.0);
    menv.gate_on(0);

    let mut osc = Oscillator::new(SAMPLE_RATE);
    osc.set_waveform(Waveform::Sine);
    osc.set_frequency(100.0);

    let mut control = [0.0f32; BLOCK];
    let mut block = [[0.0f32; 2]; BLOCK];
    let mut crossings: i32 = 0;
    let mut prev = 0.0;
    for _ in 0..86 {
        menv.render(&mut control, &ModEnvModulation::default());
        let mods = OscModulation {
            pitch: ModInput::new(&control, 1.0),
            ..OscModulation::default()
        };
        osc.render(&mut block, &mods);
        for f in &block {
            if prev <= 0.0 && f[0] > 0.0 {
                crossings += 1;
            }
            prev = f[0];
        }
    }
    // 86 blocks ≈ 1 s at 200 Hz
    assert!((crossings - 200).abs() <= 3, "crossings = {}", crossings);
}

// ============================================================================
// 4. Filter stability
// ============================================================================

/// Ten seconds of hard-clipped input with every filter input modulated far
/// past its range. Output must stay below 10 for each response type.
#[test]
fn test_filter_bounded_for_ten_seconds_of_extreme_modulation() {
    let blocks = (10.0 * SAMPLE_RATE) as usize / BLOCK + 1;
    for filter_type in [
        FilterType::Lowpass,
        FilterType::Highpass,
        FilterType::Bandpass,
        FilterType::Notch,
    ] {
        let mut svf = StateVariableFilter::new(SAMPLE_RATE);
        svf.set_filter_type(filter_type);
        svf.set_cutoff(14080.0);
        svf.set_resonance(0.02);
        svf.set_drive(10.0);
        svf.set_saturation(10.0);
        svf.set_env_amount(1.0);

        let mut control = [0.0f32; BLOCK];
        let mut env = [0.0f32; BLOCK];
        let mut block = [[0.0f32; 2]; BLOCK];
        let mut peak = 0.0f32;
        for b in 0..blocks {
            for (n, (c, e)) in control.iter_mut().zip(env.iter_mut()).enumerate() {
                let t = (b * BLOCK + n) as f32 / SAMPLE_RATE;
                *c = (t * 37.0).sin();
                *e = if (b / 8) % 2 == 0 { 1.0 } else { 0.0 };
            }
            for (n, f) in block.iter_mut().enumerate() {
                let x = if (b * BLOCK + n) % 11 < 5 { 100.0 } else { -100.0 };
                *f = [x, -x];
            }
            let mods = FilterModulation {
                cutoff: ModInput::new(&control, 50.0),
                resonance: ModInput::new(&control, -50.0),
                drive: ModInput::new(&control, 50.0),
                saturation: ModInput::new(&control, 50.0),
                env_amount: ModInput::new(&control, 50.0),
            };
            svf.render(&mut block, &env, &mods);
            for f in &block {
                assert!(f[0].is_finite() && f[1].is_finite(), "{filter_type:?} produced {f:?}");
                peak = peak.max(f[0].abs()).max(f[1].abs());
            }
        }
        assert!(peak < 10.0, "{filter_type:?} peak {peak}");
    }
}
