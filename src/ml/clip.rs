// ============================================================
// Layer 5 — Global Gradient-Norm Clipping
// ============================================================
// Burn's optimiser-level clipping works per parameter tensor.
// Here the norm is taken over ALL parameters together:
//
//   total_norm = sqrt( Σ_p ‖g_p‖² )
//   if total_norm > max_norm:  g_p ← g_p · max_norm / (total_norm + ε)
//
// Two module visitors do the work: one sums squared gradient
// norms, the other rescales every gradient in place.

use std::marker::PhantomData;

use burn::{
    module::{Module, ModuleVisitor, ParamId},
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

const EPS: f64 = 1e-6;

struct SquaredNormVisitor<'a, B: AutodiffBackend> {
    grads:  &'a GradientsParams,
    sum_sq: f64,
    _b:     PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for SquaredNormVisitor<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(id) {
            self.sum_sq += grad.powf_scalar(2.0).sum().into_scalar().elem::<f64>();
        }
    }
}

struct ScaleVisitor<'a, B: AutodiffBackend> {
    grads: &'a mut GradientsParams,
    scale: f64,
    _b:    PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for ScaleVisitor<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(id) {
            self.grads.register::<B::InnerBackend, D>(id, grad.mul_scalar(self.scale));
        }
    }
}

/// L2 norm of all gradients of `module`, taken together.
pub fn global_grad_norm<B, M>(module: &M, grads: &GradientsParams) -> f64
where
    B: AutodiffBackend,
    M: Module<B>,
{
    let mut visitor = SquaredNormVisitor::<B> { grads, sum_sq: 0.0, _b: PhantomData };
    module.visit(&mut visitor);
    visitor.sum_sq.sqrt()
}

/// Rescale `grads` so their global norm does not exceed `max_norm`.
///
/// Returns the norm measured before clipping together with the
/// (possibly rescaled) gradients.
pub fn clip_grad_norm<B, M>(module: &M, mut grads: GradientsParams, max_norm: f64) -> (f64, GradientsParams)
where
    B: AutodiffBackend,
    M: Module<B>,
{
    let total_norm = global_grad_norm::<B, M>(module, &grads);

    if total_norm.is_finite() && total_norm > max_norm {
        let scale = max_norm / (total_norm + EPS);
        let mut visitor = ScaleVisitor::<B> { grads: &mut grads, scale, _b: PhantomData };
        module.visit(&mut visitor);
        tracing::debug!("Clipped gradient norm {:.4} → {:.4}", total_norm, max_norm);
    }

    (total_norm, grads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::{Autodiff, NdArray},
        nn::{Linear, LinearConfig},
    };

    type TB = Autodiff<NdArray>;

    fn oversized_grads(device: &<TB as Backend>::Device) -> (Linear<TB>, GradientsParams) {
        let linear = LinearConfig::new(4, 3).init::<TB>(device);
        // Large inputs → raw gradient norm far above 1
        let x    = Tensor::<TB, 2>::ones([8, 4], device) * 1000.0;
        let loss = linear.forward(x).sum();
        let grads = GradientsParams::from_grads(loss.backward(), &linear);
        (linear, grads)
    }

    #[test]
    fn test_clipped_norm_never_exceeds_ceiling() {
        let device = Default::default();
        let (linear, grads) = oversized_grads(&device);

        let (before, clipped) = clip_grad_norm::<TB, _>(&linear, grads, 1.0);
        assert!(before > 1.0, "synthetic gradient too small: {before}");

        let after = global_grad_norm::<TB, _>(&linear, &clipped);
        assert!(after <= 1.0 + 1e-4, "clipped norm {after}");
        assert!(after > 0.99);
    }

    #[test]
    fn test_small_gradients_untouched() {
        let device = Default::default();
        let (linear, grads) = oversized_grads(&device);

        let norm = global_grad_norm::<TB, _>(&linear, &grads);
        let (before, same) = clip_grad_norm::<TB, _>(&linear, grads, norm * 2.0);
        assert!((before - norm).abs() < 1e-9);
        assert!((global_grad_norm::<TB, _>(&linear, &same) - norm).abs() / norm < 1e-6);
    }
}
