//! Integration Tests
//!
//! End-to-end properties of the session effect racks.

use approx::assert_relative_eq;
use test_case::test_case;

use stemfx::engine::SampleArray;
use stemfx::fx::{
    build, resolve, sample, FxRack, ParameterTable, Preset, PresetChoice, RangeTable, SeededRng,
    SessionType,
};
use stemfx::FxError;

const SR: u32 = 44100;

/// Uniform noise in [-0.5, 0.5) from the crate's own MT stream
fn noise_buffer(channels: usize, samples: usize, seed: u32) -> SampleArray {
    let mut rng = SeededRng::new(seed);
    let data = (0..channels * samples)
        .map(|_| rng.uniform(-0.5, 0.5) as f32)
        .collect();
    SampleArray::from_shape_vec(channels, samples, data).unwrap()
}

fn max_abs_diff(a: &SampleArray, b: &SampleArray) -> f32 {
    a.as_slice()
        .iter()
        .zip(b.as_slice())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f32::max)
}

// === Basic processing ===

#[test]
fn test_vocal_default_keeps_shape_and_ceiling() {
    let audio = noise_buffer(2, SR as usize / 2, 0);
    let out = FxRack::new(SessionType::Vocal).process(&audio, SR).unwrap();

    assert_eq!(out.audio.shape(), &[2, 22050]);
    assert!(out.audio.is_finite());
    assert!(out.audio.peak() <= 1.0, "peak {}", out.audio.peak());
    assert!(out.warnings.is_empty());
}

#[test_case(SessionType::Vocal ; "vocal")]
#[test_case(SessionType::Guitar ; "guitar")]
#[test_case(SessionType::Bass ; "bass")]
#[test_case(SessionType::Synth ; "synth")]
fn test_every_preset_processes_cleanly(session: SessionType) {
    let audio = noise_buffer(2, 8820, 5);
    for preset in Preset::all(session) {
        let out = FxRack::new(session)
            .with_preset(preset.id())
            .process(&audio, SR)
            .unwrap();
        assert_eq!(out.audio.shape(), &[2, 8820], "{} {}", session, preset);
        assert!(out.audio.is_finite(), "{} {}", session, preset);
        assert!(out.audio.peak() <= 1.0, "{} {}", session, preset);
        assert_eq!(out.settings.preset, preset.id());
    }
}

#[test_case(SessionType::Vocal ; "vocal")]
#[test_case(SessionType::Guitar ; "guitar")]
#[test_case(SessionType::Bass ; "bass")]
#[test_case(SessionType::Synth ; "synth")]
fn test_processing_is_deterministic(session: SessionType) {
    let audio = noise_buffer(2, 4410, 9);
    let rack = FxRack::new(session).with_seed(Some(17));
    let a = rack.process(&audio, SR).unwrap();
    let b = rack.process(&audio, SR).unwrap();
    assert_eq!(a.audio, b.audio);
    assert_eq!(a.settings, b.settings);
}

// === Randomization ===

#[test]
fn test_sampling_is_reproducible_per_seed() {
    let ranges = RangeTable::from_pairs(&[("drive_db", 3.0, 6.0)]);

    let first = sample(&ranges, 42).unwrap();
    let again = sample(&ranges, 42).unwrap();
    let other = sample(&ranges, 43).unwrap();

    assert_eq!(first.values, again.values);
    assert_ne!(first.values.get("drive_db"), other.values.get("drive_db"));
    assert_relative_eq!(first.values.get("drive_db").unwrap(), 4.123_620_4, epsilon = 1e-5);

    for s in [&first, &other] {
        let v = s.values.get("drive_db").unwrap();
        assert!((3.0..=6.0).contains(&v));
    }
}

#[test]
fn test_inverted_range_is_configuration_error() {
    let ranges = RangeTable::from_pairs(&[("drive_db", 6.0, 3.0)]);
    let err = sample(&ranges, 1).unwrap_err();
    assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
}

#[test]
fn test_seeded_chain_settings_record_seed() {
    let audio = noise_buffer(2, 4410, 3);
    let out = FxRack::new(SessionType::Guitar)
        .with_preset("crunch")
        .with_seed(Some(42))
        .process(&audio, SR)
        .unwrap();
    assert_eq!(out.settings.seed, Some(42));
    let drive = out.settings.parameters.get("drive_db").unwrap();
    assert!(out.audio.is_finite());
    assert!(drive.is_finite());
}

// === Presets ===

#[test_case(SessionType::Vocal ; "vocal")]
#[test_case(SessionType::Guitar ; "guitar")]
#[test_case(SessionType::Bass ; "bass")]
#[test_case(SessionType::Synth ; "synth")]
fn test_presets_change_the_sound(session: SessionType) {
    let audio = noise_buffer(2, 8820, 1);
    let outputs: Vec<(Preset, SampleArray)> = Preset::all(session)
        .into_iter()
        .map(|preset| {
            let out = FxRack::new(session)
                .with_preset(preset.id())
                .process(&audio, SR)
                .unwrap();
            (preset, out.audio)
        })
        .collect();
    assert!(outputs.len() >= 2, "{} has a single preset", session);

    for (i, (a, audio_a)) in outputs.iter().enumerate() {
        for (b, audio_b) in &outputs[i + 1..] {
            let diff = max_abs_diff(audio_a, audio_b);
            assert!(diff > 1e-4, "{} presets {} and {} sound the same", session, a, b);
        }
    }
}

#[test_case(SessionType::Vocal, "default" ; "vocal")]
#[test_case(SessionType::Guitar, "clean" ; "guitar")]
#[test_case(SessionType::Bass, "default" ; "bass")]
#[test_case(SessionType::Synth, "default" ; "synth")]
fn test_unknown_preset_falls_back_to_default(session: SessionType, fallback: &str) {
    let audio = noise_buffer(2, 4410, 2);
    let unknown = FxRack::new(session)
        .with_preset("does-not-exist")
        .process(&audio, SR)
        .unwrap();
    let default = FxRack::new(session).process(&audio, SR).unwrap();

    assert_eq!(unknown.audio, default.audio);
    assert_eq!(unknown.settings.preset, fallback);
    assert_eq!(unknown.warnings.len(), 1);
    assert_eq!(unknown.warnings[0].requested, "does-not-exist");
}

#[test]
fn test_unknown_override_key_is_rejected() {
    let audio = noise_buffer(2, 4410, 2);
    let err = FxRack::new(SessionType::Bass)
        .with_overrides(ParameterTable::from_pairs(&[("reverb_wet_level", 0.5)]))
        .process(&audio, SR)
        .unwrap_err();
    assert!(matches!(err, FxError::Configuration { .. }));
}

#[test]
fn test_custom_table_overrides_defaults() {
    let custom = ParameterTable::from_pairs(&[("comp_ratio", 8.0)]);
    let choice = PresetChoice::Custom(custom);
    let res = resolve(SessionType::Guitar, &choice, &ParameterTable::new()).unwrap();
    assert_eq!(res.table.get("comp_ratio"), Some(8.0));
    assert_eq!(res.preset, "custom");
}

#[test]
fn test_slot_order_stable_across_parameters() {
    let base = resolve(
        SessionType::Synth,
        &PresetChoice::named("default"),
        &ParameterTable::new(),
    )
    .unwrap();
    let tweaked = resolve(
        SessionType::Synth,
        &PresetChoice::named("spacious"),
        &ParameterTable::from_pairs(&[("comp_ratio", 5.0)]),
    )
    .unwrap();

    let a = build(&base).unwrap();
    let b = build(&tweaked).unwrap();
    assert_eq!(a.slot_order(), b.slot_order());
    assert_eq!(a.slot_order(), SessionType::Synth.slots().to_vec());
}

// === Buffer contract ===

#[test]
fn test_mono_1d_comes_back_2d() {
    let audio = SampleArray::from_vec(noise_buffer(1, 4410, 4).into_vec());
    assert_eq!(audio.shape(), &[4410]);
    let out = FxRack::new(SessionType::Vocal).process(&audio, SR).unwrap();
    assert_eq!(out.audio.shape(), &[1, 4410]);
}

#[test]
fn test_channel_first_and_last_preserved() {
    let first = noise_buffer(2, 4410, 6);
    let last = first.transpose();

    let rack = FxRack::new(SessionType::Guitar);
    let out_first = rack.process(&first, SR).unwrap();
    let out_last = rack.process(&last, SR).unwrap();

    assert_eq!(out_first.audio.shape(), &[2, 4410]);
    assert_eq!(out_last.audio.shape(), &[4410, 2]);
    assert!(max_abs_diff(&out_first.audio, &out_last.audio.transpose()) < 1e-6);
}

#[test]
fn test_multichannel_input_keeps_channel_count() {
    let audio = noise_buffer(4, 4410, 8);
    let out = FxRack::new(SessionType::Synth).process(&audio, SR).unwrap();
    assert_eq!(out.audio.shape(), &[4, 4410]);
    assert!(out.audio.is_finite());
}

#[test]
fn test_empty_audio_is_shape_error() {
    let err = FxRack::new(SessionType::Vocal)
        .process(&SampleArray::from_vec(Vec::new()), SR)
        .unwrap_err();
    assert_eq!(err.error_code(), "SHAPE_ERROR");
}

#[test]
fn test_too_few_samples_is_shape_error() {
    let square = SampleArray::from_shape_vec(3, 3, vec![0.1; 9]).unwrap();
    let err = FxRack::new(SessionType::Bass).process(&square, SR).unwrap_err();
    assert!(matches!(err, FxError::Shape { .. }));
}
