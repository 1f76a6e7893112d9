use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};

/// Output channels of the three convolution stages
pub const STAGE_CHANNELS: [usize; 3] = [32, 64, 128];

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct ClassifierConfig {
    pub num_classes:  usize,
    /// Mel bins of the input spectrogram
    pub input_height: usize,
    /// Time frames of the input spectrogram
    pub input_width:  usize,
    #[config(default = 512)]
    pub hidden_size:  usize,
    #[config(default = 0.5)]
    pub dropout:      f64,
}

impl ClassifierConfig {
    /// Spatial size after the three (conv → pool) stages.
    /// Conv is 3×3, stride 1, padding 1 (size preserving);
    /// each 2×2 pool with stride 2 floors the size in half.
    pub fn output_spatial(&self) -> [usize; 2] {
        STAGE_CHANNELS
            .iter()
            .fold([self.input_height, self.input_width], |[h, w], _| [h / 2, w / 2])
    }

    /// Width of the flattened feature vector fed to the dense head
    pub fn flattened_width(&self) -> usize {
        let [h, w] = self.output_spatial();
        STAGE_CHANNELS[STAGE_CHANNELS.len() - 1] * h * w
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> SpeechClassifier<B> {
        let mut in_channels = 1;
        let stages = STAGE_CHANNELS
            .iter()
            .map(|&out_channels| {
                let stage = ConvStage {
                    conv: Conv2dConfig::new([in_channels, out_channels], [3, 3])
                        .with_padding(PaddingConfig2d::Explicit(1, 1))
                        .init(device),
                    pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
                };
                in_channels = out_channels;
                stage
            })
            .collect();

        SpeechClassifier {
            stages,
            hidden:  LinearConfig::new(self.flattened_width(), self.hidden_size).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            output:  LinearConfig::new(self.hidden_size, self.num_classes).init(device),
        }
    }
}

/// conv 3×3 → ReLU → max-pool 2×2
#[derive(Module, Debug)]
pub struct ConvStage<B: Backend> {
    pub conv: Conv2d<B>,
    pub pool: MaxPool2d,
}

impl<B: Backend> ConvStage<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.pool.forward(relu(self.conv.forward(x)))
    }
}

#[derive(Module, Debug)]
pub struct SpeechClassifier<B: Backend> {
    pub stages:  Vec<ConvStage<B>>,
    pub hidden:  Linear<B>,
    pub dropout: Dropout,
    pub output:  Linear<B>,
}

impl<B: Backend> SpeechClassifier<B> {
    /// features: [batch, 1, n_mels, frames] → scores: [batch, num_classes]
    ///
    /// Dropout is only active on autodiff backends, i.e. during training.
    pub fn forward(&self, features: Tensor<B, 4>) -> Tensor<B, 2> {
        tracing::trace!(shape = ?features.dims(), "classifier input");
        let mut x = features;
        for (i, stage) in self.stages.iter().enumerate() {
            x = stage.forward(x);
            tracing::trace!(stage = i + 1, shape = ?x.dims(), "conv stage");
        }
        let x = x.flatten::<2>(1, 3);
        tracing::trace!(shape = ?x.dims(), "flattened");

        let x = self.hidden.forward(x);
        let x = self.dropout.forward(x);
        self.output.forward(x)
    }

    /// Scores plus mean cross-entropy against integer labels.
    pub fn forward_loss(
        &self,
        features: Tensor<B, 4>,
        labels:   Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let scores = self.forward(features);
        tracing::trace!(scores = ?scores.dims(), labels = ?labels.dims(), "computing loss");
        let loss = CrossEntropyLossConfig::new()
            .init(&scores.device())
            .forward(scores.clone(), labels);
        (loss, scores)
    }
}

/// Number of rows whose arg-max score equals the label
pub fn correct_predictions<B: Backend>(scores: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> usize {
    // argmax(1) returns [batch, 1]; flatten to [batch] before comparing
    let predicted = scores.argmax(1).flatten::<1>(0, 1);
    predicted
        .equal(labels)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::record::{BinBytesRecorder, FullPrecisionSettings, Recorder};

    type TestBackend = NdArray;

    fn config() -> ClassifierConfig {
        ClassifierConfig::new(4, 16, 17).with_hidden_size(8)
    }

    #[test]
    fn test_flattened_width_for_default_features() {
        let cfg = ClassifierConfig::new(28, 128, 44);
        assert_eq!(cfg.output_spatial(), [16, 5]);
        assert_eq!(cfg.flattened_width(), 128 * 16 * 5);
    }

    #[test]
    fn test_analytic_width_matches_forward_pass() {
        let device = Default::default();
        let cfg    = config();
        let model: SpeechClassifier<TestBackend> = cfg.init(&device);

        let input = Tensor::<TestBackend, 4>::zeros([2, 1, 16, 17], &device);
        let mut x = input.clone();
        for stage in &model.stages {
            x = stage.forward(x);
        }
        assert_eq!(x.flatten::<2>(1, 3).dims(), [2, cfg.flattened_width()]);
        assert_eq!(model.forward(input).dims(), [2, 4]);
    }

    #[test]
    fn test_record_restores_into_fresh_model_before_any_forward() {
        let device = Default::default();
        let cfg    = config();
        let trained: SpeechClassifier<TestBackend> = cfg.init(&device);

        let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
        let bytes = recorder.record(trained.clone().into_record(), ()).unwrap();
        let record = recorder.load(bytes, &device).unwrap();
        let restored = cfg.init::<TestBackend>(&device).load_record(record);

        let input = Tensor::<TestBackend, 4>::ones([1, 1, 16, 17], &device);
        let a = trained.forward(input.clone()).into_data();
        let b = restored.forward(input).into_data();
        a.assert_approx_eq(&b, 5);
    }

    #[test]
    fn test_loss_and_accuracy() {
        let device = Default::default();
        let model: SpeechClassifier<TestBackend> = config().init(&device);
        let features = Tensor::<TestBackend, 4>::ones([3, 1, 16, 17], &device);
        let labels   = Tensor::<TestBackend, 1, Int>::from_ints([0, 1, 2], &device);

        let (loss, scores) = model.forward_loss(features, labels.clone());
        assert!(loss.into_scalar().elem::<f64>().is_finite());
        assert!(correct_predictions(scores, labels) <= 3);
    }

    #[test]
    fn test_correct_predictions_counts_argmax_matches() {
        let device = Default::default();
        let scores = Tensor::<TestBackend, 2>::from_floats(
            [[0.1, 0.9], [0.8, 0.2], [0.3, 0.7]],
            &device,
        );
        let labels = Tensor::<TestBackend, 1, Int>::from_ints([1, 0, 0], &device);
        assert_eq!(correct_predictions(scores, labels), 2);
    }
}
