use log::info;

use crate::config::Hyperparams;
use crate::init::Initializer;
use crate::math::{argmax, dot_prod, one_hot, sigmoid, sigmoid_derivative, transpose};
use crate::optim::Regularization;
use crate::schedule::{AdaptiveRate, ERROR_THRESHOLD, LearningRateController, MIN_LEARNING_RATE};
use crate::{
    CostFunction, DatasetProvider, Error, Gradients, Matrix, ParameterSet, Result, Topology,
};

/// Per-example forward-pass cache.
///
/// `ys[0]` is the raw input, `ys[l + 1] = sigmoid(zs[l])`. Built by [`forward`]
/// and consumed by [`backprop`]; never kept across examples.
#[derive(Debug, Clone)]
pub struct Activations {
    zs: Vec<Matrix>,
    ys: Vec<Matrix>,
}

impl Activations {
    /// Pre-activations, one per non-input layer.
    #[inline]
    pub fn zs(&self) -> &[Matrix] {
        &self.zs
    }

    /// Activations, input layer first.
    #[inline]
    pub fn ys(&self) -> &[Matrix] {
        &self.ys
    }

    #[inline]
    pub fn output(&self) -> &Matrix {
        self.ys
            .last()
            .expect("activations always include the input layer")
    }
}

/// Forward pass for a single input.
///
/// For every transition: `z = W · y + b`, `y' = sigmoid(z)`.
pub fn forward(params: &ParameterSet, input: &[f32]) -> Result<Activations> {
    let n = params.num_transitions();
    let mut zs = Vec::with_capacity(n);
    let mut ys = Vec::with_capacity(n + 1);
    ys.push(Matrix::column(input));

    for l in 0..n {
        let mut z = dot_prod(params.weights(l), &ys[l])?;
        z.add_assign(params.biases(l))?;
        ys.push(sigmoid(&z));
        zs.push(z);
    }

    Ok(Activations { zs, ys })
}

/// Backpropagates `output_delta` through the hidden layers.
///
/// `delta_l = (W_l^T · delta_{l+1}) * sigmoid'(z_l)` for `l = L-2 .. 1`.
/// Returns one delta per non-input layer, ordered from the first hidden layer
/// to the output layer.
pub fn backprop(
    params: &ParameterSet,
    activations: &Activations,
    output_delta: Matrix,
) -> Result<Vec<Matrix>> {
    let n = params.num_transitions();
    if activations.zs.len() != n {
        return Err(Error::DimensionMismatch(format!(
            "activations cover {} layers, parameters have {n}",
            activations.zs.len()
        )));
    }

    let mut deltas = vec![output_delta];
    for l in (1..n).rev() {
        let next = &deltas[deltas.len() - 1];
        let propagated = dot_prod(&transpose(params.weights(l)), next)?;
        let delta = propagated.hadamard(&sigmoid_derivative(&activations.zs[l - 1]))?;
        deltas.push(delta);
    }
    deltas.reverse();
    Ok(deltas)
}

/// Forward pass, output error, backprop and gradient for one example.
pub fn example_gradients(
    params: &ParameterSet,
    cost: CostFunction,
    input: &[f32],
    target: &[f32],
) -> Result<Gradients> {
    let activations = forward(params, input)?;
    let last = activations.zs.len() - 1;
    let delta = cost.output_delta(activations.output(), &activations.zs[last], target)?;
    let deltas = backprop(params, &activations, delta)?;
    Gradients::from_deltas(&activations, deltas)
}

/// A sigmoid multi-layer perceptron together with its training hyperparameters.
///
/// The network owns its `ParameterSet`; training mutates it in place, inference
/// only ever borrows it.
#[derive(Debug, Clone)]
pub struct Network {
    topology: Topology,
    params: ParameterSet,
    cost: CostFunction,
    regularization: Regularization,
    mini_batch: usize,
    pub(crate) rate: LearningRateController,
}

impl Network {
    pub fn new(topology: Topology, params: ParameterSet, hyper: &Hyperparams) -> Result<Self> {
        hyper.validate()?;
        params.check_topology(&topology)?;

        Ok(Self {
            topology,
            params,
            cost: hyper.cost,
            regularization: hyper.regularization,
            mini_batch: hyper.mini_batch,
            rate: LearningRateController::new(hyper.learning_rate, hyper.adaptive_rate)?,
        })
    }

    /// Builds a network whose initial parameters come from `initializer`.
    pub fn with_initializer(
        topology: Topology,
        hyper: &Hyperparams,
        initializer: &mut dyn Initializer,
    ) -> Result<Self> {
        let params = initializer.initialize(&topology)?;
        Self::new(topology, params, hyper)
    }

    #[inline]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    #[inline]
    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    #[inline]
    pub(crate) fn params_mut(&mut self) -> &mut ParameterSet {
        &mut self.params
    }

    /// Replaces the parameters wholesale (e.g. after an external load).
    pub fn set_params(&mut self, params: ParameterSet) -> Result<()> {
        params.check_topology(&self.topology)?;
        self.params = params;
        Ok(())
    }

    #[inline]
    pub fn cost_function(&self) -> CostFunction {
        self.cost
    }

    #[inline]
    pub fn regularization(&self) -> Regularization {
        self.regularization
    }

    #[inline]
    pub fn mini_batch(&self) -> usize {
        self.mini_batch
    }

    /// Current learning rate.
    #[inline]
    pub fn learning_rate(&self) -> f32 {
        self.rate.rate()
    }

    #[inline]
    pub fn learning_rate_controller(&self) -> &LearningRateController {
        &self.rate
    }

    pub fn feed_forward(&self, input: &[f32]) -> Result<Activations> {
        self.check_input(input)?;
        forward(&self.params, input)
    }

    /// Output activations for `input`.
    pub fn output(&self, input: &[f32]) -> Result<Vec<f32>> {
        Ok(self.feed_forward(input)?.output().as_slice().to_vec())
    }

    /// Index of the strongest output (earliest index on ties).
    pub fn predict(&self, input: &[f32]) -> Result<usize> {
        let acts = self.feed_forward(input)?;
        argmax(acts.output().as_slice())
            .ok_or_else(|| Error::InvalidData("network produced an empty output".to_owned()))
    }

    /// Gradients of the cost for one labelled example.
    pub fn gradients(&self, input: &[f32], label: usize) -> Result<Gradients> {
        self.check_input(input)?;
        let target = one_hot(label, self.topology.output_dim())?;
        example_gradients(&self.params, self.cost, input, &target)
    }

    /// Mean cost over the training split of `data`.
    pub fn training_cost<D: DatasetProvider + ?Sized>(&self, data: &D) -> Result<f32> {
        let n = data.training_len();
        if n == 0 {
            return Err(Error::InvalidData("training set is empty".to_owned()));
        }

        let mut total = 0.0_f32;
        for idx in 0..n {
            let ex = data.training_example(idx);
            let y = self.output(ex.input)?;
            let target = one_hot(ex.label, self.topology.output_dim())?;
            total += self.cost.cost(&y, &target);
        }
        Ok(total / n as f32)
    }

    /// Human-readable parameter reference, one setting per line.
    pub fn describe(&self) -> String {
        let mut lines = vec![
            format!("shape: {}", self.topology),
            format!("cost function: {:?}", self.cost),
            format!("learning rate: {}", self.rate.rate()),
            format!("adaptive learning rate: {:?}", self.rate.mode()),
        ];
        if self.rate.mode() != AdaptiveRate::None {
            lines.push(format!("  activation error threshold: {ERROR_THRESHOLD}"));
            lines.push(format!("  minimum learning rate: {MIN_LEARNING_RATE}"));
        }
        match self.regularization {
            Regularization::None => lines.push("regularization: none".to_owned()),
            Regularization::L2 { lambda } => {
                lines.push("regularization: L2".to_owned());
                lines.push(format!("  lambda: {lambda}"));
            }
        }
        lines.push(format!("mini batch: {}", self.mini_batch));
        lines.join("\n")
    }

    pub(crate) fn log_reference(&self) {
        for line in self.describe().lines() {
            info!("{line}");
        }
    }

    fn check_input(&self, input: &[f32]) -> Result<()> {
        if input.len() != self.topology.input_dim() {
            return Err(Error::DimensionMismatch(format!(
                "input len {} does not match network input_dim {}",
                input.len(),
                self.topology.input_dim()
            )));
        }
        Ok(())
    }
}
