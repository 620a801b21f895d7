//! End-to-end pipeline run over synthetic REM epochs with injected band
//! power, mirroring a real Sleep-EDF file pair at 256 Hz.

use dream_decoder_core::{
    BandPowerExtractor, DecoderError, DecoderResult, DreamDecoder, Epoch, EpochSet, EpochSource,
    PipelineConfig,
};

const SAMPLING_RATE_HZ: f32 = 256.0;
const EPOCH_SECS: f32 = 30.0;

/// Ten epochs, each dominated by one of the four canonical bands, with a
/// weaker broadband component so no channel is a pure tone.
struct RemSource {
    epochs: usize,
}

fn synthetic_epoch(index: usize, samples: usize) -> Epoch {
    let dominant = [2.0_f32, 6.0, 10.0, 20.0][index % 4];
    let mut data = Vec::with_capacity(2 * samples);
    for channel in 0..2_usize {
        let amp = 40.0 + 10.0 * channel as f32; // microvolt scale
        for i in 0..samples {
            let t = i as f32 / SAMPLING_RATE_HZ;
            let main = amp * (2.0 * std::f32::consts::PI * dominant * t).sin();
            let background = 3.0 * (2.0 * std::f32::consts::PI * 14.0 * t).cos();
            data.push(main + background);
        }
    }
    Epoch::new(2, samples, data).unwrap()
}

impl EpochSource for RemSource {
    fn load_epochs(&self, stage_filter: &str, epoch_duration_secs: f32) -> DecoderResult<EpochSet> {
        assert_eq!(stage_filter, "Sleep stage R");
        let samples = (SAMPLING_RATE_HZ * epoch_duration_secs) as usize;
        Ok(EpochSet {
            epochs: (0..self.epochs).map(|i| synthetic_epoch(i, samples)).collect(),
            sampling_rate_hz: SAMPLING_RATE_HZ,
        })
    }

    fn describe(&self) -> String {
        format!("synthetic REM recording ({} epochs)", self.epochs)
    }
}

#[test]
fn ten_epochs_produce_ten_feature_vectors_of_length_eight() {
    let config = PipelineConfig::default();
    let samples = (SAMPLING_RATE_HZ * EPOCH_SECS) as usize;
    assert_eq!(samples, 7680);

    let extractor =
        BandPowerExtractor::new(&config.bands, config.filter_order, 2, SAMPLING_RATE_HZ).unwrap();
    let epochs: Vec<Epoch> = (0..10).map(|i| synthetic_epoch(i, samples)).collect();
    let features = extractor.extract_all(&epochs).unwrap();

    assert_eq!(features.rows(), 10);
    assert_eq!(features.dim(), 8);
    for row in 0..10 {
        assert!(features.row(row).iter().all(|v| v.is_finite() && *v >= 0.0));
    }
}

#[test]
fn full_pipeline_assigns_every_epoch_a_cluster_and_prompt() {
    let config = PipelineConfig::default(); // latent 64, k 4, seed 42, 150 epochs
    let decoder = DreamDecoder::new(config).unwrap();
    let report = decoder.process_pair(&RemSource { epochs: 10 }).unwrap();

    assert_eq!(report.epoch_count, 10);
    assert_eq!(report.feature_dim, 8);
    assert_eq!(report.effective_k, 4);
    assert_eq!(report.assignments.len(), 10);
    assert!(report.assignments.iter().all(|&id| id < 4));

    let table: Vec<&str> = (0..4).map(dream_decoder_core::assign_prompt).collect();
    for prompt in &report.prompts {
        assert!(table.contains(prompt));
    }
    for (prompt, insight) in report.prompts.iter().zip(report.insights.iter()) {
        assert_eq!(*insight, dream_decoder_core::resolve_insight(prompt));
    }

    assert!(report.first_loss.is_finite());
    assert!(report.final_loss.is_finite());
    assert!(
        report.final_loss <= report.first_loss,
        "training regressed: {} -> {}",
        report.first_loss,
        report.final_loss
    );
}

#[test]
fn identical_runs_are_reproducible() {
    let decoder = DreamDecoder::new(PipelineConfig {
        training_epochs: 20,
        ..PipelineConfig::default()
    })
    .unwrap();
    let a = decoder.process_pair(&RemSource { epochs: 8 }).unwrap();
    let b = decoder.process_pair(&RemSource { epochs: 8 }).unwrap();
    assert_eq!(a.assignments, b.assignments);
    assert_eq!(a.first_loss, b.first_loss);
    assert_eq!(a.final_loss, b.final_loss);
}

#[test]
fn fewer_epochs_than_clusters_shrinks_effective_k() {
    let decoder = DreamDecoder::new(PipelineConfig {
        training_epochs: 10,
        ..PipelineConfig::default()
    })
    .unwrap();
    let report = decoder.process_pair(&RemSource { epochs: 3 }).unwrap();
    assert_eq!(report.effective_k, 3);
    assert!(report.assignments.iter().all(|&id| id < 3));
}

#[test]
fn zero_epoch_source_fails_without_training() {
    struct Empty;
    impl EpochSource for Empty {
        fn load_epochs(&self, _: &str, _: f32) -> DecoderResult<EpochSet> {
            Ok(EpochSet {
                epochs: Vec::new(),
                sampling_rate_hz: SAMPLING_RATE_HZ,
            })
        }
    }

    let decoder = DreamDecoder::new(PipelineConfig::default()).unwrap();
    assert!(matches!(
        decoder.process_pair(&Empty),
        Err(DecoderError::InsufficientData { .. })
    ));
}
