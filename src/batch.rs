//! Parallel compilation of independent components.

use rayon::prelude::*;

use crate::diagnostics::CompileError;
use crate::options::CompileOptions;
use crate::{compile_component, CompileResult};

#[derive(Debug, Clone)]
pub struct BatchInput {
    pub source: String,
    pub options: CompileOptions,
}

/// Compile every input on the rayon pool. Each file runs the ordinary
/// single-threaded pipeline; results come back in input order.
pub fn compile_batch(inputs: &[BatchInput]) -> Vec<Result<CompileResult, CompileError>> {
    tracing::debug!(files = inputs.len(), "batch compile");
    inputs
        .par_iter()
        .map(|input| compile_component(&input.source, &input.options))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_keeps_input_order() {
        let inputs: Vec<BatchInput> = (0..8)
            .map(|i| BatchInput {
                source: format!("<script>let n = {};</script><p>{{n}}</p>", i),
                options: CompileOptions::for_file(format!("Item{}.zen", i)),
            })
            .collect();
        let results = compile_batch(&inputs);
        assert_eq!(results.len(), 8);
        for (i, result) in results.iter().enumerate() {
            let result = result.as_ref().unwrap();
            assert_eq!(result.component_name, format!("Item{}", i));
            assert!(result.code.as_deref().unwrap().contains(&format!("= ({});", i)));
        }
    }

    #[test]
    fn test_one_bad_file_does_not_poison_the_batch() {
        let inputs = vec![
            BatchInput {
                source: "<p>{missing}</p>".to_string(),
                options: CompileOptions::for_file("Bad.zen"),
            },
            BatchInput {
                source: "<p>ok</p>".to_string(),
                options: CompileOptions::for_file("Good.zen"),
            },
        ];
        let results = compile_batch(&inputs);
        assert!(results[0].as_ref().unwrap().code.is_none());
        assert!(results[1].as_ref().unwrap().code.is_some());
    }
}
