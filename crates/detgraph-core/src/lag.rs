//! Lag - republish a state type one pass later
//!
//! Installing `Lag<T>` gives every detector access to the previous pass's
//! `T` as `Lagged<T>`, which is the standard way to feed a result back into
//! its own producers without creating an immediate cycle.

use crate::{Detector, DetectorId, FuturePublisher, Graph, GraphResult, Subscriber, TopicState};

/// `T` as it was one evaluation pass ago
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Lagged<T>(pub T);

/// Detector forwarding `T` to `Lagged<T>` through a deferred publication
pub struct Lag<T> {
    out: FuturePublisher<Lagged<T>>,
}

impl<T: TopicState> Lag<T> {
    /// Wire and install a lag for `T`
    pub fn install(graph: &mut Graph) -> GraphResult<DetectorId> {
        let mut builder = graph.build_detector::<Lag<T>>();
        builder.subscribe::<T>();
        let out = builder.future_publisher::<Lagged<T>>();
        builder.install(Lag { out })
    }
}

impl<T: TopicState> Detector for Lag<T> {}

impl<T: TopicState> Subscriber<T> for Lag<T> {
    fn evaluate(&mut self, value: &T) {
        self.out.publish_on_future_evaluation(Lagged(value.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Publisher;

    #[derive(Clone, Debug, PartialEq)]
    struct Level(i32);

    /// Publishes a new level from its own previous output
    struct Integrator {
        out: Publisher<Level>,
    }

    impl Detector for Integrator {}

    impl Subscriber<Lagged<Level>> for Integrator {
        fn evaluate(&mut self, value: &Lagged<Level>) {
            if value.0 .0 < 3 {
                self.out.publish(Level(value.0 .0 + 1));
            }
        }
    }

    #[test]
    fn test_lag_closes_feedback_loop() {
        let mut graph = Graph::new();
        Lag::<Level>::install(&mut graph).unwrap();

        let mut builder = graph.build_detector::<Integrator>();
        builder.subscribe::<Lagged<Level>>();
        let out = builder.publisher::<Level>();
        builder.install(Integrator { out }).unwrap();

        let level = graph.resolve_topic::<Level>();
        let lagged = graph.resolve_topic::<Lagged<Level>>();

        graph.push_data(Level(0));
        graph.evaluate_graph().unwrap();
        assert_eq!(level.new_value().unwrap(), Level(0));
        assert!(!lagged.has_new_value());

        graph.evaluate_graph().unwrap();
        assert_eq!(lagged.new_value().unwrap(), Lagged(Level(0)));
        assert_eq!(level.new_value().unwrap(), Level(1));

        graph.evaluate_graph().unwrap();
        graph.evaluate_graph().unwrap();
        assert_eq!(level.new_value().unwrap(), Level(3));

        // Feedback stops once the integrator stops publishing
        graph.evaluate_graph().unwrap();
        assert_eq!(lagged.new_value().unwrap(), Lagged(Level(3)));
        assert!(!level.has_new_value());
        graph.evaluate_graph().unwrap();
        assert!(!graph.has_data_pending());
    }
}
