use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
        Lstm, LstmConfig,
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};

/// Conv feature channels per object; each object also carries
/// its 2 normalised grid coordinates.
pub const CONV_CHANNELS: usize = 24;
pub const OBJECT_FEATURES: usize = CONV_CHANNELS + 2;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct RelationNetConfig {
    pub qdict_size:  usize,
    pub adict_size:  usize,
    pub wordemb_dim: usize,
    pub lstm_hidden: usize,
    pub g_layers:    Vec<usize>,
    pub f_fc1:       usize,
    pub f_fc2:       usize,
    pub dropout:     f64,
    pub question_injection_position: usize,
}

impl RelationNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> RelationNetwork<B> {
        let conv = ConvEncoder::init(device);

        // +1: token id 0 is padding and needs an embedding row too
        let embedding = EmbeddingConfig::new(self.qdict_size + 1, self.wordemb_dim).init(device);
        let lstm = LstmConfig::new(self.wordemb_dim, self.lstm_hidden, true).init(device);

        let widths = self.g_input_widths();
        let mut g_layers = Vec::with_capacity(self.g_layers.len());
        for (&in_features, &out_features) in widths.iter().zip(self.g_layers.iter()) {
            g_layers.push(LinearConfig::new(in_features, out_features).init(device));
        }

        let g_out = self.g_layers.last().copied().unwrap_or(2 * OBJECT_FEATURES);
        let f_fc1 = LinearConfig::new(g_out, self.f_fc1).init(device);
        let f_fc2 = LinearConfig::new(self.f_fc1, self.f_fc2).init(device);
        let f_fc3 = LinearConfig::new(self.f_fc2, self.adict_size).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();

        RelationNetwork {
            conv,
            embedding,
            lstm,
            g_layers,
            f_fc1,
            f_fc2,
            f_fc3,
            dropout,
            question_injection: self.question_injection_position,
        }
    }

    /// Input width of every g layer, in order. The layer at the
    /// question injection position sees the pair features plus
    /// the broadcast question embedding; every other layer sees
    /// the previous layer's output unchanged.
    pub fn g_input_widths(&self) -> Vec<usize> {
        let mut widths = Vec::with_capacity(self.g_layers.len());
        let mut in_features = 2 * OBJECT_FEATURES;
        for (idx, &out_features) in self.g_layers.iter().enumerate() {
            if idx == self.question_injection_position {
                in_features += self.lstm_hidden;
            }
            widths.push(in_features);
            in_features = out_features;
        }
        widths
    }
}

/// Four strided conv blocks: 128x128x3 → 8x8x24.
#[derive(Module, Debug)]
pub struct ConvEncoder<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    conv3: Conv2d<B>,
    conv4: Conv2d<B>,
    bn1:   BatchNorm<B, 2>,
    bn2:   BatchNorm<B, 2>,
    bn3:   BatchNorm<B, 2>,
    bn4:   BatchNorm<B, 2>,
}

impl<B: Backend> ConvEncoder<B> {
    fn init(device: &B::Device) -> Self {
        let conv = |cin: usize| {
            Conv2dConfig::new([cin, CONV_CHANNELS], [3, 3])
                .with_stride([2, 2])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device)
        };
        let bn = || BatchNormConfig::new(CONV_CHANNELS).init(device);
        ConvEncoder {
            conv1: conv(3),
            conv2: conv(CONV_CHANNELS),
            conv3: conv(CONV_CHANNELS),
            conv4: conv(CONV_CHANNELS),
            bn1: bn(),
            bn2: bn(),
            bn3: bn(),
            bn4: bn(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = relu(self.bn1.forward(self.conv1.forward(x)));
        let x = relu(self.bn2.forward(self.conv2.forward(x)));
        let x = relu(self.bn3.forward(self.conv3.forward(x)));
        relu(self.bn4.forward(self.conv4.forward(x)))
    }
}

#[derive(Module, Debug)]
pub struct RelationNetwork<B: Backend> {
    conv:      ConvEncoder<B>,
    embedding: Embedding<B>,
    lstm:      Lstm<B>,
    g_layers:  Vec<Linear<B>>,
    f_fc1:     Linear<B>,
    f_fc2:     Linear<B>,
    f_fc3:     Linear<B>,
    dropout:   Dropout,
    question_injection: usize,
}

impl<B: Backend> RelationNetwork<B> {
    /// images: [batch, 3, 128, 128], questions: [batch, seq_len],
    /// lengths: [batch] true token counts before padding
    /// → answer logits [batch, adict_size]
    pub fn forward(
        &self,
        images:    Tensor<B, 4>,
        questions: Tensor<B, 2, Int>,
        lengths:   Tensor<B, 1, Int>,
    ) -> Tensor<B, 2> {
        self.forward_inner(images, questions, lengths, None).0
    }

    /// Like `forward`, but also returns the input activations of
    /// g layer `layer` (or of f_fc1 when `layer == g_layer_count`)
    /// viewed as [batch, combinations, features]. This is the
    /// capture point feature extraction aggregates over.
    pub fn forward_with_features(
        &self,
        images:    Tensor<B, 4>,
        questions: Tensor<B, 2, Int>,
        lengths:   Tensor<B, 1, Int>,
        layer:     usize,
    ) -> (Tensor<B, 2>, Tensor<B, 3>) {
        let (logits, features) = self.forward_inner(images, questions, lengths, Some(layer));
        // forward_inner always fills the capture for a valid layer index
        let features = features
            .unwrap_or_else(|| panic!("no layer {} to extract from", layer));
        (logits, features)
    }

    pub fn g_layer_count(&self) -> usize {
        self.g_layers.len()
    }

    fn forward_inner(
        &self,
        images:    Tensor<B, 4>,
        questions: Tensor<B, 2, Int>,
        lengths:   Tensor<B, 1, Int>,
        capture:   Option<usize>,
    ) -> (Tensor<B, 2>, Option<Tensor<B, 3>>) {
        let feat = self.conv.forward(images); // [b, C, d, d]
        let [batch_size, channels, d, _] = feat.dims();
        let n = d * d;

        // Objects are the feature-map columns, tagged with their
        // normalised grid position so g can reason about layout.
        let objects = feat.reshape([batch_size, channels, n]).swap_dims(1, 2);
        let coords = coordinate_grid::<B>(d, &objects.device());
        let objects = Tensor::cat(vec![objects, coords.expand([batch_size, n, 2])], 2);

        // All n*n ordered object pairs: [b*n*n, 2 * (C + 2)]
        let o_i = objects
            .clone()
            .unsqueeze_dim::<4>(1)
            .expand([batch_size, n, n, OBJECT_FEATURES]);
        let o_j = objects
            .unsqueeze_dim::<4>(2)
            .expand([batch_size, n, n, OBJECT_FEATURES]);
        let mut x = Tensor::cat(vec![o_i, o_j], 3)
            .reshape([batch_size * n * n, 2 * OBJECT_FEATURES]);

        // Question embedding: the LSTM output at each sample's
        // last real token, broadcast to every pair at the
        // injection layer. Shorter questions in a batch are
        // right-padded with id 0; the hidden state AFTER the
        // padding would be corrupted by the padding embeddings.
        let embedded = self.embedding.forward(questions);
        let (lstm_out, _) = self.lstm.forward(embedded, None); // [b, seq, hidden]
        let hidden = lstm_out.dims()[2];
        let last_token = lengths
            .sub_scalar(1)
            .clamp_min(0)
            .reshape([batch_size, 1, 1])
            .expand([batch_size, 1, hidden]);
        let question = lstm_out.gather(1, last_token).squeeze::<2>(1); // [b, lstm_hidden]
        let question_rep = question
            .unsqueeze_dim::<3>(1)
            .expand([batch_size, n * n, hidden])
            .reshape([batch_size * n * n, hidden]);

        let mut captured: Option<Tensor<B, 2>> = None;
        for (idx, g) in self.g_layers.iter().enumerate() {
            if idx == self.question_injection {
                x = Tensor::cat(vec![x, question_rep.clone()], 1);
            }
            if capture == Some(idx) {
                captured = Some(x.clone());
            }
            x = relu(g.forward(x));
        }

        // Aggregate over pairs: the relation sum
        let g_out = x.dims()[1];
        let summed = x
            .reshape([batch_size, n * n, g_out])
            .sum_dim(1)
            .squeeze::<2>(1); // [b, g_out]

        let features = match capture {
            Some(layer) if layer == self.g_layers.len() => {
                // f_fc1 sees one post-sum vector per sample
                Some(summed.clone().unsqueeze_dim::<3>(1))
            }
            _ => captured.map(|t| {
                let width = t.dims()[1];
                t.reshape([batch_size, n * n, width])
            }),
        };

        let x = relu(self.f_fc1.forward(summed));
        let x = relu(self.f_fc2.forward(x));
        let x = self.dropout.forward(x);
        let logits = self.f_fc3.forward(x);

        (logits, features)
    }
}

/// [1, d*d, 2] tensor of per-object (row, col) coordinates
/// scaled to [-1, 1].
fn coordinate_grid<B: Backend>(d: usize, device: &B::Device) -> Tensor<B, 3> {
    let n = d * d;
    let scale = (d.saturating_sub(1)).max(1) as f32 / 2.0;
    let mut coords = Vec::with_capacity(n * 2);
    for i in 0..n {
        let row = (i / d) as f32;
        let col = (i % d) as f32;
        coords.push((row - scale) / scale);
        coords.push((col - scale) / scale);
    }
    Tensor::<B, 1>::from_floats(coords.as_slice(), device).reshape([1, n, 2])
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn config(g_layers: Vec<usize>, injection: usize) -> RelationNetConfig {
        RelationNetConfig::new(80, 28, 32, 128, g_layers, 256, 256, 0.5, injection)
    }

    #[test]
    fn test_injection_at_first_g_layer_widens_only_it() {
        let widths = config(vec![256, 256, 256, 256], 0).g_input_widths();
        assert_eq!(widths, vec![2 * OBJECT_FEATURES + 128, 256, 256, 256]);
    }

    #[test]
    fn test_injection_mid_stack_widens_only_that_layer() {
        let widths = config(vec![256, 256, 256, 256], 2).g_input_widths();
        assert_eq!(widths, vec![2 * OBJECT_FEATURES, 256, 256 + 128, 256]);
    }

    #[test]
    fn test_injection_at_last_g_layer() {
        let widths = config(vec![256, 128, 64], 2).g_input_widths();
        assert_eq!(widths, vec![2 * OBJECT_FEATURES, 256, 128 + 128]);
    }
}
