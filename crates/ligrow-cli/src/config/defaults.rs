pub struct DefaultsConfig {
    pub seed: u64,
    pub num_generations: usize,
    pub num_elitists: usize,
    pub max_failures: usize,
    pub num_additions: usize,
    pub num_subtractions: usize,
    pub num_crossovers: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            num_generations: 8,
            num_elitists: 10,
            max_failures: 10,
            num_additions: 20,
            num_subtractions: 10,
            num_crossovers: 20,
        }
    }
}
