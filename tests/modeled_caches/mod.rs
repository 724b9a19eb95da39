mod children_cache_case;
mod node_cache_case;
