use burn::{
    nn::{
        conv::{Conv1d, Conv1dConfig},
        loss::{MseLoss, Reduction},
        Dropout, DropoutConfig,
        Linear, LinearConfig,
        Lstm, LstmConfig,
        PaddingConfig1d,
    },
    prelude::*,
    tensor::activation::{relu, softmax, tanh},
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally, do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct HybridModelConfig {
    pub n_features:    usize,
    #[config(default = 32)]
    pub conv_filters:  usize,
    /// Must be odd so "same" padding keeps the sequence length.
    #[config(default = 3)]
    pub kernel_size:   usize,
    #[config(default = 64)]
    pub lstm_hidden:   usize,
    #[config(default = 32)]
    pub attention_dim: usize,
    #[config(default = 64)]
    pub dense_units:   usize,
    #[config(default = 0.2)]
    pub dropout:       f64,
}

impl HybridModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> HybridLstModel<B> {
        let conv1 = Conv1dConfig::new(self.n_features, self.conv_filters, self.kernel_size)
            .with_padding(PaddingConfig1d::Same)
            .init(device);
        let conv2 = Conv1dConfig::new(self.conv_filters, self.conv_filters, self.kernel_size)
            .with_padding(PaddingConfig1d::Same)
            .init(device);
        let lstm      = LstmConfig::new(self.n_features, self.lstm_hidden, true).init(device);
        let attention = AdditiveAttention {
            projection: LinearConfig::new(self.lstm_hidden, self.attention_dim).init(device),
            score:      LinearConfig::new(self.attention_dim, 1).with_bias(false).init(device),
        };
        let dense   = LinearConfig::new(self.conv_filters + self.lstm_hidden, self.dense_units)
            .init(device);
        let output  = LinearConfig::new(self.dense_units, 1).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        HybridLstModel { conv1, conv2, lstm, attention, dense, output, dropout }
    }
}

/// Bahdanau-style scoring: `score_t = v · tanh(W h_t + b)`.
#[derive(Module, Debug)]
pub struct AdditiveAttention<B: Backend> {
    pub projection: Linear<B>,
    pub score:      Linear<B>,
}

impl<B: Backend> AdditiveAttention<B> {
    /// states: [batch, steps, hidden] → (context [batch, hidden], weights [batch, steps])
    pub fn forward(&self, states: Tensor<B, 3>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [batch, steps, hidden] = states.dims();

        let energy  = tanh(self.projection.forward(states.clone()));
        let scores  = self.score.forward(energy).reshape([batch, steps]);
        let weights = softmax(scores, 1);

        let context = (states * weights.clone().reshape([batch, steps, 1]).expand([batch, steps, hidden]))
            .sum_dim(1)
            .reshape([batch, hidden]);

        (context, weights)
    }
}

/// Two branches over the same input window:
///
///   conv:  Conv1d → ReLU → Conv1d → ReLU → mean over time
///   rnn:   LSTM → additive attention → context vector
///
/// Both summaries are concatenated and regressed to one value.
#[derive(Module, Debug)]
pub struct HybridLstModel<B: Backend> {
    pub conv1:     Conv1d<B>,
    pub conv2:     Conv1d<B>,
    pub lstm:      Lstm<B>,
    pub attention: AdditiveAttention<B>,
    pub dense:     Linear<B>,
    pub output:    Linear<B>,
    pub dropout:   Dropout,
}

impl<B: Backend> HybridLstModel<B> {
    /// inputs: [batch, seq_len, n_features] → predictions: [batch, 1]
    pub fn forward(&self, inputs: Tensor<B, 3>) -> Tensor<B, 2> {
        self.forward_with_attention(inputs).0
    }

    /// Same as `forward`, also returning the attention weights [batch, seq_len].
    pub fn forward_with_attention(&self, inputs: Tensor<B, 3>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [batch, _, _] = inputs.dims();

        // Conv1d wants channels first: [batch, n_features, seq_len]
        let local = inputs.clone().swap_dims(1, 2);
        let local = relu(self.conv1.forward(local));
        let local = relu(self.conv2.forward(local));
        let filters = local.dims()[1];
        let local = local.mean_dim(2).reshape([batch, filters]);

        let (states, _) = self.lstm.forward(inputs, None);
        let (context, weights) = self.attention.forward(states);

        let merged = Tensor::cat(vec![local, context], 1);
        let hidden = self.dropout.forward(relu(self.dense.forward(merged)));

        (self.output.forward(hidden), weights)
    }

    /// Mean squared error against scaled targets [batch, 1].
    pub fn forward_loss(&self, inputs: Tensor<B, 3>, targets: Tensor<B, 2>) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let output = self.forward(inputs);
        let loss = MseLoss::new().forward(output.clone(), targets, Reduction::Mean);
        (loss, output)
    }
}
